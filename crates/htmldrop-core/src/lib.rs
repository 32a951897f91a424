//! HTML Drop Core - storage, resource proxying and lifecycle for pasted HTML projects.
//!
//! This crate holds every stateful part of the service. It can be driven
//! directly without any HTTP layer; `htmldrop-server` is a thin axum surface
//! over [`HtmlDrop`].
//!
//! # Example
//!
//! ```rust,ignore
//! use htmldrop_core::{HtmlDrop, Settings};
//!
//! #[tokio::main]
//! async fn main() -> htmldrop_core::Result<()> {
//!     let service = HtmlDrop::builder(Settings::from_env()?).build()?;
//!
//!     let created = service.create_project("<title>Hello</title>").await?;
//!     println!("Preview at {}", created.url);
//!
//!     let css = service.proxy_resource("https://cdn.jsdelivr.net/npm/water.css@2/out/water.css").await?;
//!     println!("{} ({} bytes)", css.status, css.bytes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod atomic;
pub mod cache;
pub mod config;
pub mod error;
pub mod listing;
pub mod network;
pub mod project;
pub mod proxy;
pub mod quota;
pub mod reaper;

mod api;

// Re-export commonly used types
pub use api::{CreatedProject, HtmlDropBuilder, ReaperStatus};
pub use cache::{CacheStatus, ResourceCacheStats, TierStats};
pub use config::{LogFormat, Settings};
pub use error::{HtmlDropError, Result};
pub use listing::{ListingCache, ListingSnapshot, Pagination, ProjectPage};
pub use network::{FetchedResource, HttpFetcher, OriginAllowList, ResourceFetcher};
pub use project::{Project, ProjectMetadata, ProjectStore, ProjectSummary};
pub use proxy::{ClearReport, ProxiedResource, ResourceProxy};
pub use quota::{QuotaAccountant, QuotaStatus};
pub use reaper::{ExpiryReaper, LastReap, ReapReport, ReaperHandle};

use std::sync::Arc;

/// Facade over every component, built once at startup and shared by handle.
///
/// Operations live in `impl HtmlDrop` blocks under `api/`.
pub struct HtmlDrop {
    settings: Settings,
    store: Arc<ProjectStore>,
    quota: QuotaAccountant,
    listing: Arc<ListingCache>,
    proxy: ResourceProxy,
    reaper: Arc<ExpiryReaper>,
}

impl HtmlDrop {
    /// Start configuring an instance.
    pub fn builder(settings: Settings) -> HtmlDropBuilder {
        HtmlDropBuilder::new(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn listing(&self) -> &Arc<ListingCache> {
        &self.listing
    }
}
