//! Third-party resource proxy endpoint.

use super::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use htmldrop_core::config::NetworkConfig;
use htmldrop_core::HtmlDropError;
use serde::Deserialize;
use std::sync::Arc;

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// `GET /proxy?url=...`
pub async fn proxy_resource(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProxyQuery>,
) -> ApiResult<Response> {
    let url = query
        .url
        .ok_or_else(|| HtmlDropError::invalid_input("url", "URL parameter is required"))?;

    let resource = state.service.proxy_resource(&url).await?;

    Ok((
        [
            (header::CONTENT_TYPE, resource.content_type),
            (CACHE_STATUS_HEADER, resource.status.as_str().to_string()),
            (
                header::CACHE_CONTROL,
                format!("public, max-age={}", NetworkConfig::BROWSER_CACHE_MAX_AGE_SECS),
            ),
        ],
        resource.bytes,
    )
        .into_response())
}
