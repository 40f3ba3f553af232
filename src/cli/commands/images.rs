use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::json;

use super::auth::session_client;
use crate::cli::utils::{describe_image, output_empty_collection, output_success};
use crate::cli::OutputFormat;

pub async fn upload(server: Option<String>, path: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = session_client(server)?;

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let content_type = mime_guess::from_path(path).first_or_octet_stream();

    let image = client
        .post_file("/api/images", file_name.clone(), content_type.essence_str(), bytes)
        .await?;

    output_success(
        &output_format,
        &format!("Uploaded {} -> {}", file_name, image["url"].as_str().unwrap_or_default()),
        Some(image),
    )
}

pub async fn attach(server: Option<String>, url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = session_client(server)?;
    let image = client.post_json("/api/images/url", &json!({ "url": url })).await?;

    output_success(&output_format, &format!("Attached {}", url), Some(image))
}

pub async fn list(server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = session_client(server)?;
    let images = client.get("/api/images").await?;

    let entries = images.as_array().cloned().unwrap_or_default();
    if entries.is_empty() {
        return output_empty_collection(&output_format, "images", "No images yet");
    }

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "images": entries }))?),
        OutputFormat::Text => {
            for image in &entries {
                println!("{}", describe_image(image));
            }
        }
    }
    Ok(())
}

pub async fn render(server: Option<String>, out: Option<&Path>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = session_client(server)?;
    let html = client.get_text("/api/gallery").await?;

    match out {
        Some(path) => {
            fs::write(path, &html).with_context(|| format!("failed to write {}", path.display()))?;
            output_success(
                &output_format,
                &format!("Gallery written to {}", path.display()),
                Some(json!({ "path": path.display().to_string(), "bytes": html.len() })),
            )
        }
        None => {
            print!("{}", html);
            Ok(())
        }
    }
}
