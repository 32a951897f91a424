//! Scheduled deletion of expired projects.

use crate::error::{HtmlDropError, Result};
use crate::listing::ListingCache;
use crate::project::ProjectStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

/// The most recent sweep and when it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastReap {
    pub finished_at: DateTime<Utc>,
    pub report: ReapReport,
}

/// Deletes projects whose HTML body has not been modified within `expiry`.
///
/// Deletions go through [`ProjectStore::delete`] and so share its locking
/// with request-driven deletions.
pub struct ExpiryReaper {
    store: Arc<ProjectStore>,
    listing: Arc<ListingCache>,
    expiry: Duration,
    last: Mutex<Option<LastReap>>,
}

impl ExpiryReaper {
    pub fn new(store: Arc<ProjectStore>, listing: Arc<ListingCache>, expiry: Duration) -> Self {
        Self {
            store,
            listing,
            expiry,
            last: Mutex::new(None),
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Run one sweep now.
    ///
    /// A failure on one project is logged and counted; the sweep continues.
    /// The listing is invalidated once at the end if anything was deleted.
    pub async fn sweep(&self) -> Result<ReapReport> {
        let ids = self.store.list_ids().await?;
        let now = SystemTime::now();
        let mut report = ReapReport {
            scanned: ids.len(),
            ..ReapReport::default()
        };

        for id in ids {
            let modified = match self.store.last_modified(&id).await {
                Ok(modified) => modified,
                Err(HtmlDropError::NotFound { .. }) => continue,
                Err(e) => {
                    warn!("Could not read age of project {}: {}", id, e);
                    report.failed += 1;
                    continue;
                }
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.expiry {
                continue;
            }

            match self.store.delete(&id).await {
                Ok(()) => {
                    debug!("Reaped project {} (age {}s)", id, age.as_secs());
                    report.deleted += 1;
                }
                // Deleted concurrently.
                Err(HtmlDropError::NotFound { .. }) => {}
                Err(e) => {
                    error!("Failed to reap project {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        if report.deleted > 0 {
            self.listing.invalidate();
        }
        info!(
            "Expiry sweep finished: {} scanned, {} deleted, {} failed",
            report.scanned, report.deleted, report.failed
        );

        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(LastReap {
            finished_at: Utc::now(),
            report,
        });
        Ok(report)
    }

    pub fn last_run(&self) -> Option<LastReap> {
        *self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start sweeping every `interval`, first after one full interval.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Expiry reaper started (every {}s)", interval.as_secs());

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Expiry reaper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.sweep().await {
                            error!("Expiry sweep failed: {}", e);
                        }
                    }
                }
            }
        });

        ReaperHandle {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
        }
    }
}

/// Handle to a running reaper task. Dropping it stops the task.
pub struct ReaperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ReaperHandle {
    /// Ask the task to stop after any sweep in progress.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Stop the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}
