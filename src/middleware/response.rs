use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::types::{ScopeVersions, SCOPE_VERSIONS_HEADER};

/// JSON response carrying the scope versions it reflects in `x-scope-versions`.
/// Bodies go out as-is: the CRM front end expects bare scope values.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub versions: Option<ScopeVersions>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self {
            data,
            versions: None,
        }
    }

    pub fn versioned(mut self, versions: ScopeVersions) -> Self {
        self.versions = Some(versions);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "message": "Failed to serialize response data",
                        "code": "INTERNAL_SERVER_ERROR"
                    })),
                )
                    .into_response();
            }
        };

        let mut response = (StatusCode::OK, Json(body)).into_response();
        if let Some(versions) = self.versions.filter(|v| !v.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(&versions.to_header_value()) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(SCOPE_VERSIONS_HEADER), value);
            }
        }
        response
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
