//! Storage accounting and expiry maintenance.

use crate::error::Result;
use crate::quota::QuotaStatus;
use crate::reaper::{ReapReport, ReaperHandle};
use crate::HtmlDrop;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECS_PER_HOUR: u64 = 60 * 60;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Reaper configuration and last outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperStatus {
    pub expiry_days: u64,
    pub interval_hours: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_deleted: usize,
    pub project_count: usize,
}

impl HtmlDrop {
    /// Sweep expired projects now.
    pub async fn run_reaper(&self) -> Result<ReapReport> {
        self.reaper.sweep().await
    }

    /// Start the timer-driven sweep at the configured interval.
    pub fn start_reaper(&self) -> ReaperHandle {
        self.reaper.clone().spawn(self.settings.cleanup_interval)
    }

    pub async fn reaper_status(&self) -> Result<ReaperStatus> {
        let last = self.reaper.last_run();
        Ok(ReaperStatus {
            expiry_days: self.reaper.expiry().as_secs() / SECS_PER_DAY,
            interval_hours: self.settings.cleanup_interval.as_secs() / SECS_PER_HOUR,
            last_run: last.map(|l| l.finished_at),
            last_deleted: last.map(|l| l.report.deleted).unwrap_or(0),
            project_count: self.store.count().await?,
        })
    }

    /// Current storage usage against the quota.
    pub fn storage_status(&self) -> QuotaStatus {
        self.quota.status()
    }
}
