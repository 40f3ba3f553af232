#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

pub const IDENTITY_SECRET: &str = "integration-identity-secret";
pub const IDENTITY_ISSUER: &str = "gallery-tests";
pub const IDENTITY_AUDIENCE: &str = "image-gallery";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Memory backends and the shared-secret provider keep each run self-contained
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_image-gallery"));
        cmd.env("APP_ENV", "development")
            .env("HOST", "127.0.0.1")
            .env("GALLERY_PORT", port.to_string())
            .env("PUBLIC_BASE_URL", &base_url)
            .env("JWT_SECRET", "integration-session-secret")
            .env("IDENTITY_PROVIDER", "shared-secret")
            .env("IDENTITY_SHARED_SECRET", IDENTITY_SECRET)
            .env("IDENTITY_ISSUER", IDENTITY_ISSUER)
            .env("IDENTITY_AUDIENCE", IDENTITY_AUDIENCE)
            .env("STORAGE_BACKEND", "memory")
            .env("DOCUMENT_BACKEND", "memory")
            .env("GALLERY_COLUMNS", "4")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    // Use stable get_or_init and convert init errors into a panic with context.
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A fresh address per test so tests never share user data
pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@gallery.test", prefix, uuid::Uuid::new_v4().simple())
}

/// HS256 ID token accepted by the server's shared-secret identity provider
pub fn id_token(email: &str, name: Option<&str>) -> String {
    id_token_with(email, name, IDENTITY_SECRET, 3600)
}

pub fn id_token_with(email: &str, name: Option<&str>, secret: &str, expires_in: i64) -> String {
    let claims = json!({
        "email": email,
        "name": name,
        "iss": IDENTITY_ISSUER,
        "aud": IDENTITY_AUDIENCE,
        "exp": chrono::Utc::now().timestamp() + expires_in,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("failed to sign test ID token")
}

/// POST /auth/sign-in and return the response body
pub async fn sign_in_raw(server: &TestServer, id_token: &str) -> Result<(StatusCode, Value)> {
    let res = reqwest::Client::new()
        .post(server.url("/auth/sign-in"))
        .json(&json!({ "id_token": id_token }))
        .send()
        .await?;
    let status = res.status();
    Ok((status, res.json().await?))
}

/// Signs in a new user and returns (email, session token)
pub async fn signed_in_user(server: &TestServer, prefix: &str) -> Result<(String, String)> {
    let email = unique_email(prefix);
    let (status, body) = sign_in_raw(server, &id_token(&email, Some(prefix))).await?;
    anyhow::ensure!(status == StatusCode::OK, "sign-in failed: {}", body);
    let token = body["data"]["token"]
        .as_str()
        .context("sign-in response has no token")?
        .to_string();
    Ok((email, token))
}

/// Multipart upload of `bytes` as field `file`
pub async fn upload(
    server: &TestServer,
    token: &str,
    file_name: &str,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<reqwest::Response> {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(content_type)?;
    let form = reqwest::multipart::Form::new().part("file", part);

    Ok(reqwest::Client::new()
        .post(server.url("/api/images"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await?)
}

pub async fn list_images(server: &TestServer, token: &str) -> Result<Vec<Value>> {
    let body: Value = reqwest::Client::new()
        .get(server.url("/api/images"))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(body["data"].as_array().cloned().unwrap_or_default())
}

pub async fn gallery_html(server: &TestServer, token: &str) -> Result<String> {
    Ok(reqwest::Client::new()
        .get(server.url("/api/gallery"))
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?)
}

/// A few bytes that start like a PNG; the server never decodes image data
pub fn fake_png(seed: &str) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend_from_slice(seed.as_bytes());
    bytes
}
