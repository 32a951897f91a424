//! HTTP server implementation using Axum.

use crate::handlers::{self, maintenance, projects, proxy};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use htmldrop_core::HtmlDrop;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Room for form encoding and base64 on top of the decoded upload ceiling.
/// The exact limit is enforced on the decoded payload.
const BODY_LIMIT_FACTOR: u64 = 4;

/// Application state shared across handlers.
pub struct AppState {
    pub service: HtmlDrop,
}

/// Handle to a running server task.
pub struct ServerHandle {
    /// Address the server is bound to (useful when port=0)
    pub addr: SocketAddr,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Wait until the server has drained after its shutdown signal.
    pub async fn wait(self) -> anyhow::Result<()> {
        self.task.await??;
        Ok(())
    }
}

/// Build the router over a configured service.
pub fn build_router(service: HtmlDrop) -> Router {
    let static_root = service.settings().projects_dir();
    let body_limit = service
        .settings()
        .max_upload_bytes
        .saturating_mul(BODY_LIMIT_FACTOR)
        .try_into()
        .unwrap_or(usize::MAX);
    let state = Arc::new(AppState { service });

    // Previews are loaded from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/proxy", get(proxy::proxy_resource))
        .route("/upload", post(projects::upload))
        .route("/api/projects", get(projects::list_projects))
        .route(
            "/api/projects/:id",
            get(projects::get_project).delete(projects::delete_project),
        )
        .route("/api/projects/:id/thumbnail", post(projects::save_thumbnail))
        .route("/api/cdn-cache/stats", get(maintenance::cache_stats))
        .route("/api/cdn-cache/clear", post(maintenance::clear_cache))
        .route("/api/cdn-cache/cleanup", post(maintenance::cleanup_cache))
        .route("/api/cleanup/run", post(maintenance::run_cleanup))
        .route("/api/cleanup/status", get(maintenance::cleanup_status))
        .route("/api/storage", get(maintenance::storage))
        .nest_service("/static", ServeDir::new(static_root))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind and serve in the background until `shutdown` resolves.
pub async fn start_server<F>(
    service: HtmlDrop,
    host: &str,
    port: u16,
    shutdown: F,
) -> anyhow::Result<ServerHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(service);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!("Server listening on {}", addr);

    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    });

    Ok(ServerHandle { addr, task })
}
