//! Upload, listing and per-project endpoints.

use super::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Form, Json,
};
use htmldrop_core::config::ProjectConfig;
use htmldrop_core::HtmlDropError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadForm {
    #[serde(default)]
    pub html_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailRequest {
    #[serde(default)]
    pub image: Option<String>,
}

/// `POST /upload`
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Form(form): Form<UploadForm>,
) -> ApiResult<impl IntoResponse> {
    let html = form.html_content.unwrap_or_default();
    let created = state.service.create_project(&html).await?;

    Ok(Json(json!({
        "success": true,
        "project_id": created.project_id,
        "url": created.url,
        "message": "Project created successfully",
    })))
}

/// `GET /api/projects?page=&per_page=`
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .service
        .list_projects(
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(ProjectConfig::DEFAULT_PER_PAGE),
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "projects": page.projects,
        "pagination": page.pagination,
    })))
}

/// `GET /api/projects/:id`
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state.service.get_project(&id).await?;
    Ok(Json(json!({ "success": true, "project": project })))
}

/// `DELETE /api/projects/:id`
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.service.delete_project(&id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Project {} deleted", id),
    })))
}

/// `POST /api/projects/:id/thumbnail`
pub async fn save_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ThumbnailRequest>,
) -> ApiResult<impl IntoResponse> {
    let image = request
        .image
        .ok_or_else(|| HtmlDropError::invalid_input("image", "No image data provided"))?;
    state.service.attach_thumbnail(&id, &image).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Thumbnail saved",
    })))
}
