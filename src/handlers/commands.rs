use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde_json::Value;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::CommandRequest;

/// POST /api/commands - Run one resource/action command
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let outcome = state.commands.execute(request).await?;
    let body = outcome.body().map_err(|e| ApiError::internal_server_error(e.to_string()))?;
    Ok(ApiResponse::success(body).versioned(outcome.versions()))
}
