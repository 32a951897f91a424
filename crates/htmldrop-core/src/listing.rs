//! Short-TTL cache of the sorted project listing.

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::project::{ProjectStore, ProjectSummary};
use chrono::{DateTime, Utc};
use mini_moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Full, sorted materialization of the project store.
#[derive(Debug, Clone)]
pub struct ListingSnapshot {
    /// Newest first.
    pub projects: Vec<ProjectSummary>,
    pub captured_at: DateTime<Utc>,
    pub ttl: Duration,
}

/// Pagination metadata for one page of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPage {
    pub projects: Vec<ProjectSummary>,
    pub pagination: Pagination,
}

impl ListingSnapshot {
    /// Slice out a page. `page` starts at 1; `per_page` is clamped to the
    /// allowed range. Pages past the end are empty.
    pub fn page(&self, page: usize, per_page: usize) -> ProjectPage {
        let per_page = per_page.clamp(1, ProjectConfig::MAX_PER_PAGE);
        let page = page.max(1);
        let total = self.projects.len();
        let total_pages = total.div_ceil(per_page);

        let start = (page - 1).saturating_mul(per_page).min(total);
        let end = start.saturating_add(per_page).min(total);

        ProjectPage {
            projects: self.projects[start..end].to_vec(),
            pagination: Pagination {
                page,
                per_page,
                total,
                total_pages,
                has_next: page < total_pages,
                has_prev: page > 1,
            },
        }
    }
}

/// Listing cache over a [`ProjectStore`].
///
/// Serves the cached snapshot while it is younger than the TTL. Every
/// mutation of the store must call [`ListingCache::invalidate`].
pub struct ListingCache {
    store: Arc<ProjectStore>,
    host_url: String,
    ttl: Duration,
    snapshot: Cache<(), Arc<ListingSnapshot>>,
    /// Bumped on every invalidation; a rebuild that raced one is discarded.
    generation: AtomicU64,
    rebuild_lock: Mutex<()>,
}

impl ListingCache {
    pub fn new(store: Arc<ProjectStore>, host_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            store,
            host_url: host_url.into(),
            ttl,
            snapshot: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
            generation: AtomicU64::new(0),
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Current snapshot, rebuilt from the store when absent or expired.
    pub async fn get(&self) -> Result<Arc<ListingSnapshot>> {
        if let Some(snapshot) = self.snapshot.get(&()) {
            return Ok(snapshot);
        }

        let _rebuild = self.rebuild_lock.lock().await;
        if let Some(snapshot) = self.snapshot.get(&()) {
            return Ok(snapshot);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let projects = self.store.summaries(&self.host_url).await?;
        debug!("Rebuilt project listing with {} projects", projects.len());

        let snapshot = Arc::new(ListingSnapshot {
            projects,
            captured_at: Utc::now(),
            ttl: self.ttl,
        });
        if self.generation.load(Ordering::SeqCst) == generation {
            self.snapshot.insert((), snapshot.clone());
        }
        Ok(snapshot)
    }

    /// Convenience for `get()` followed by [`ListingSnapshot::page`].
    pub async fn page(&self, page: usize, per_page: usize) -> Result<ProjectPage> {
        Ok(self.get().await?.page(page, per_page))
    }

    /// Drop the snapshot so the next `get()` rebuilds.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.snapshot.invalidate(&());
        debug!("Project listing invalidated");
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
