use chrono::{Duration, Utc};
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{clear_session, load_session, resolve_server, save_session, StoredSession};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

pub async fn sign_in(server: Option<String>, id_token: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let server = resolve_server(server, load_session()?.as_ref());
    let client = ApiClient::new(server.clone(), None)?;

    let data = client.post_json("/auth/sign-in", &json!({ "id_token": id_token })).await?;

    let token = data["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("sign-in response is missing the session token"))?;
    let session = StoredSession {
        server,
        token: token.to_string(),
        email: data["user"]["email"].as_str().unwrap_or_default().to_string(),
        display_name: data["user"]["display_name"].as_str().unwrap_or_default().to_string(),
        expires_at: Utc::now() + Duration::seconds(data["expires_in"].as_i64().unwrap_or_default()),
    };
    save_session(&session)?;

    let registered = data["registered"].as_str().unwrap_or("existing");
    output_success(
        &output_format,
        &format!("Signed in as {} ({} user) on {}", session.email, registered, session.server),
        Some(json!({
            "email": session.email,
            "display_name": session.display_name,
            "registered": registered,
            "expires_at": session.expires_at,
        })),
    )
}

pub fn sign_out(output_format: OutputFormat) -> anyhow::Result<()> {
    let removed = clear_session()?;
    let message = if removed { "Signed out" } else { "No stored session" };
    output_success(&output_format, message, None)
}

pub async fn whoami(server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = session_client(server)?;
    let data = client.get("/api/auth/whoami").await?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        OutputFormat::Text => {
            println!("Email: {}", data["email"].as_str().unwrap_or_default());
            println!("Name: {}", data["display_name"].as_str().unwrap_or_default());
            if let Some(created_at) = data["user"]["created_at"].as_str() {
                println!("Registered: {}", created_at);
            }
            println!("Server: {}", client.base_url());
        }
    }
    Ok(())
}

pub async fn health(server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let server = resolve_server(server, load_session()?.as_ref());
    let data = ApiClient::new(server.clone(), None)?.get("/health").await?;

    output_success(
        &output_format,
        &format!("{} is healthy (storage: {})", server, data["storage"].as_str().unwrap_or("unknown")),
        Some(data),
    )
}

/// Client carrying the stored session token; fails when not signed in
pub fn session_client(server: Option<String>) -> anyhow::Result<ApiClient> {
    let session = load_session()?
        .ok_or_else(|| anyhow::anyhow!("Not signed in. Run `gallery sign-in --id-token <token>` first"))?;
    if session.is_expired() {
        anyhow::bail!("Session for {} has expired. Sign in again", session.email);
    }

    let server = resolve_server(server, Some(&session));
    ApiClient::new(server, Some(session.token))
}
