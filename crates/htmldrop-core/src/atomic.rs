//! Atomic file operations.
//!
//! Every file the service writes (HTML bodies, thumbnails, metadata records,
//! cached resources) goes through write-then-rename:
//! 1. Write to a uniquely named temp file in the target directory
//! 2. fsync so the data reaches disk
//! 3. Rename over the target path
//!
//! Readers therefore see either the old file or the complete new one.

use crate::config::CacheConfig;
use crate::error::{HtmlDropError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist, or an error if parsing fails.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HtmlDropError::io_with_path(e, path)),
    };

    let data: T = serde_json::from_str(&contents).map_err(|e| HtmlDropError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Serialize `data` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(data).map_err(|e| HtmlDropError::Json {
        message: format!("Failed to serialize data: {}", e),
        source: Some(e),
    })?;
    atomic_write_bytes(path, &serialized)
}

/// Write raw bytes to `path` atomically, replacing any existing file.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        HtmlDropError::Internal(format!("Path has no parent directory: {}", path.display()))
    })?;
    if !parent.exists() {
        fs::create_dir_all(parent).map_err(|e| HtmlDropError::io_with_path(e, parent))?;
    }

    let mut temp = tempfile::Builder::new()
        .prefix(CacheConfig::TEMP_PREFIX)
        .tempfile_in(parent)
        .map_err(|e| HtmlDropError::io_with_path(e, parent))?;

    temp.write_all(bytes)
        .map_err(|e| HtmlDropError::io_with_path(e, temp.path()))?;
    temp.flush()
        .map_err(|e| HtmlDropError::io_with_path(e, temp.path()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| HtmlDropError::io_with_path(e, temp.path()))?;

    temp.persist(path)
        .map_err(|e| HtmlDropError::io_with_path(e.error, path))?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Whether a directory entry name belongs to an in-flight atomic write.
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(CacheConfig::TEMP_PREFIX)
}
