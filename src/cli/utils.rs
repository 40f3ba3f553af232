use serde_json::{json, Value};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// One line per image reference for text output
pub fn describe_image(image: &Value) -> String {
    let name = image["file_name"].as_str().unwrap_or("-");
    let size = image["size"]
        .as_u64()
        .map(|bytes| format!("{} bytes", bytes))
        .unwrap_or_else(|| "external".to_string());
    format!("{}  {}  ({})", image["url"].as_str().unwrap_or_default(), name, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_uploaded_and_external_images() {
        let uploaded = json!({"url": "http://g.test/media/k.png", "file_name": "cat.png", "size": 12});
        assert_eq!(describe_image(&uploaded), "http://g.test/media/k.png  cat.png  (12 bytes)");

        let external = json!({"url": "https://cdn.test/dog.jpg", "file_name": null, "size": null});
        assert_eq!(describe_image(&external), "https://cdn.test/dog.jpg  -  (external)");
    }
}
