//! Resource cache, expiry and storage maintenance endpoints.

use super::ApiResult;
use crate::server::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

// ============================================================================
// Resource cache
// ============================================================================

/// `GET /api/cdn-cache/stats`
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.cache_stats())
}

/// `POST /api/cdn-cache/clear`
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let report = state.service.clear_cache()?;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Cleared {} memory entries and {} cached files",
            report.memory_cleared, report.files_cleared
        ),
        "memory_cleared": report.memory_cleared,
        "files_cleared": report.files_cleared,
    })))
}

/// `POST /api/cdn-cache/cleanup`
pub async fn cleanup_cache(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let removed = state.service.cleanup_cache()?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Removed {} expired cache files", removed),
        "removed": removed,
    })))
}

// ============================================================================
// Project expiry
// ============================================================================

/// `POST /api/cleanup/run`
pub async fn run_cleanup(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let report = state.service.run_reaper().await?;
    Ok(Json(json!({
        "success": true,
        "deleted": report.deleted,
        "failed": report.failed,
        "message": format!("Deleted {} expired projects", report.deleted),
    })))
}

/// `GET /api/cleanup/status`
pub async fn cleanup_status(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.reaper_status().await?))
}

// ============================================================================
// Storage
// ============================================================================

/// `GET /api/storage`
pub async fn storage(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.storage_status())
}
