use serde_json::json;
use std::io::Write;

use crate::cli::utils::{guess_content_type, output_success};
use crate::cli::OutputFormat;
use crate::client::ApiClient;

pub async fn upload(
    api: &ApiClient,
    case_id: &str,
    path: &str,
    content_type: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot read '{}': {}", path, e))?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    let content_type = content_type.or_else(|| guess_content_type(path));

    let uploaded = api.upload_document(case_id, &file_name, content_type, bytes).await?;
    let document = uploaded.data.document;

    output_success(
        &output_format,
        &format!("Uploaded '{}' as {} ({} bytes)", document.name, document.id, document.size),
        Some(json!({ "document": document, "versions": uploaded.versions.to_header_value() })),
    )
}

pub async fn download(
    api: &ApiClient,
    case_id: &str,
    document_id: &str,
    output: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let file = api.download_document(case_id, document_id).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &file.bytes)
                .await
                .map_err(|e| anyhow::anyhow!("Cannot write '{}': {}", path, e))?;
            output_success(
                &output_format,
                &format!("Saved {} bytes ({}) to {}", file.bytes.len(), file.content_type, path),
                Some(json!({ "path": path, "contentType": file.content_type, "size": file.bytes.len() })),
            )
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&file.bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

pub async fn remove(api: &ApiClient, case_id: &str, document_id: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let removed = api.delete_document(case_id, document_id).await?;
    output_success(
        &output_format,
        &format!("Removed document {} from case {}", removed.data.document_id, removed.data.case_id),
        Some(json!({
            "caseId": removed.data.case_id,
            "documentId": removed.data.document_id,
            "versions": removed.versions.to_header_value(),
        })),
    )
}
