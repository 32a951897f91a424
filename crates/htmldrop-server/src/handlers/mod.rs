//! HTTP handlers and the error-to-response mapping they share.

pub mod maintenance;
pub mod projects;
pub mod proxy;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use htmldrop_core::HtmlDropError;
use serde_json::json;
use tracing::{error, warn};

// ============================================================================
// Error responses
// ============================================================================

/// Wraps a core error so handlers can return it with `?`.
#[derive(Debug)]
pub struct ApiError(HtmlDropError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<HtmlDropError> for ApiError {
    fn from(err: HtmlDropError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if err.is_internal() {
            error!("Request failed: {}", err);
        } else if status.is_server_error() {
            warn!("Upstream or storage refusal: {}", err);
        }

        let body = match &err {
            HtmlDropError::QuotaExceeded {
                used_bytes,
                quota_bytes,
            } => json!({
                "success": false,
                "error": err.public_message(),
                "used_bytes": used_bytes,
                "quota_bytes": quota_bytes,
            }),
            _ => json!({
                "success": false,
                "error": err.public_message(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Health
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
