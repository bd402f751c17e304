use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - Service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "LexCRM API",
        "version": version,
        "description": "Legal-practice CRM backend: clients, cases, billing and settings",
        "endpoints": {
            "health": "GET /health",
            "bootstrap": "GET /api/bootstrap",
            "commands": "POST /api/commands",
            "upload": "POST /api/documents/upload",
            "download": "GET /api/documents/:caseId/:documentId",
            "remove_document": "DELETE /api/cases/:caseId/documents/:documentId",
        }
    }))
}

/// GET /health - Storage reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let storage = state.repo.store().name();

    match state.repo.store().health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "storage": storage
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "storage": storage,
                    "storage_error": e.to_string()
                })),
            )
        }
    }
}
