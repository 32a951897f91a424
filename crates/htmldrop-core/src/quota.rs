//! Storage quota accounting over the project tree.

use crate::error::{HtmlDropError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Current usage against the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub used_bytes: u64,
    pub quota_bytes: u64,
    pub has_headroom: bool,
}

/// Sums project storage on demand.
///
/// Nothing is cached: every call walks the whole tree, so an admission
/// decision always sees the bytes currently on disk.
pub struct QuotaAccountant {
    root: PathBuf,
    quota_bytes: u64,
}

impl QuotaAccountant {
    pub fn new(root: impl Into<PathBuf>, quota_bytes: u64) -> Self {
        Self {
            root: root.into(),
            quota_bytes,
        }
    }

    pub fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Bytes of regular files under the project root.
    pub fn usage(&self) -> Result<u64> {
        tree_size(&self.root)
    }

    /// Whether another write may be admitted.
    ///
    /// A failed walk admits the write.
    pub fn has_headroom(&self) -> bool {
        self.status().has_headroom
    }

    /// Usage with the admission decision, failing open on walk errors.
    pub fn status(&self) -> QuotaStatus {
        match self.usage() {
            Ok(used_bytes) => QuotaStatus {
                used_bytes,
                quota_bytes: self.quota_bytes,
                has_headroom: used_bytes < self.quota_bytes,
            },
            Err(e) => {
                warn!("Storage usage walk failed, admitting write: {}", e);
                QuotaStatus {
                    used_bytes: 0,
                    quota_bytes: self.quota_bytes,
                    has_headroom: true,
                }
            }
        }
    }

    /// Fail with `QuotaExceeded` when usage is at or over the ceiling.
    pub fn ensure_headroom(&self) -> Result<QuotaStatus> {
        let status = self.status();
        if status.has_headroom {
            Ok(status)
        } else {
            Err(HtmlDropError::QuotaExceeded {
                used_bytes: status.used_bytes,
                quota_bytes: status.quota_bytes,
            })
        }
    }
}

/// Total size of regular files below `path`.
///
/// Symbolic links are neither followed nor counted. A missing root is empty.
pub fn tree_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(|e| {
            let at = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
            match e.into_io_error() {
                Some(io) => HtmlDropError::io_with_path(io, at),
                None => HtmlDropError::Internal(format!("Filesystem loop at {}", at.display())),
            }
        })?;
        if entry.file_type().is_file() {
            let meta = entry
                .metadata()
                .map_err(|e| HtmlDropError::Internal(format!("Failed to stat file: {}", e)))?;
            total += meta.len();
        }
    }
    Ok(total)
}
