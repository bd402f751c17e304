use serde::Serialize;
use serde_json::{json, Value};
use std::io::Read;

use crate::cli::OutputFormat;
use crate::client::Toast;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{}", Toast::success(message));
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("{}", Toast::error(message));
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", Toast::info(message));
        }
    }
    Ok(())
}

/// Pretty JSON in both formats; text mode prints a heading first
pub fn output_value<T: Serialize>(output_format: &OutputFormat, heading: &str, value: &T) -> anyhow::Result<()> {
    if let OutputFormat::Text = output_format {
        println!("{}", heading);
    }
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON payload from an argument, `-` for stdin, or nothing
pub fn read_payload(arg: Option<&str>) -> anyhow::Result<Option<Value>> {
    let raw = match arg {
        None => return Ok(None),
        Some("-") => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        Some(text) => text.to_string(),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| anyhow::anyhow!("Invalid JSON payload: {}", e))
}

/// Content type for an upload, from its extension
pub fn guess_content_type(path: &str) -> Option<&'static str> {
    let extension = std::path::Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_argument_is_parsed() {
        assert_eq!(read_payload(None).unwrap(), None);
        assert_eq!(read_payload(Some("{\"id\":\"x\"}")).unwrap(), Some(json!({"id": "x"})));
        assert!(read_payload(Some("{nope")).is_err());
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type("laudo.PDF"), Some("application/pdf"));
        assert_eq!(guess_content_type("foto.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("sem_extensao"), None);
    }
}
