use axum::extract::State;

use crate::app::AppState;
use crate::database::models::Bootstrap;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/bootstrap - Every scope in one object
pub async fn get(State(state): State<AppState>) -> ApiResult<Bootstrap> {
    let snapshot = state.bootstrap.read().await?;
    Ok(ApiResponse::success(snapshot.data).versioned(snapshot.versions))
}
