use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::DocumentUpload;

/// POST /api/documents/upload - Multipart form with `file` and `caseId`
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Value> {
    let mut case_id: Option<String> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("caseId") => case_id = Some(field.text().await?),
            Some("file") => {
                let file_name = field.file_name().unwrap_or("arquivo").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                state.documents.check_size(bytes.len())?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let case_id = case_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("caseId não informado"))?;
    let (file_name, content_type, bytes) = file.ok_or_else(|| ApiError::bad_request("file não informado"))?;

    let outcome = state
        .documents
        .upload(DocumentUpload { case_id, file_name, content_type, bytes })
        .await?;

    Ok(ApiResponse::success(json!({
        "document": outcome.document,
        "case": outcome.case,
    }))
    .versioned(outcome.versions))
}

/// DELETE /api/cases/:case_id/documents/:document_id
pub async fn delete(
    State(state): State<AppState>,
    Path((case_id, document_id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let outcome = state.documents.delete(&case_id, &document_id).await?;
    Ok(ApiResponse::success(json!({
        "caseId": outcome.case_id,
        "documentId": outcome.document_id,
        "case": outcome.case,
    }))
    .versioned(outcome.versions))
}

/// GET /api/documents/:case_id/:document_id - Raw bytes with the stored content type
pub async fn download(
    State(state): State<AppState>,
    Path((case_id, document_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file = state.documents.download(&case_id, &document_id).await?;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", sanitize_filename(&file.file_name)))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type), (header::CONTENT_DISPOSITION, disposition)],
        file.bytes,
    )
        .into_response())
}

/// Keep the name usable inside a quoted header parameter
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() { '_' } else { c })
        .collect()
}
