//! Disk-backed tier with age-based expiry.

use super::content_type::{content_type_for, extension_for, known_extensions};
use super::types::TierStats;
use crate::atomic::{atomic_write_bytes, is_temp_name};
use crate::error::{HtmlDropError, Result};
use bytes::Bytes;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// A resource located on disk without knowing its content type up front.
#[derive(Debug, Clone)]
pub struct DiskHit {
    pub bytes: Bytes,
    pub content_type: String,
}

/// One file per cached resource under a dedicated root.
///
/// Files are named `{fingerprint}.{ext}` with the extension derived from the
/// content type. A file whose modification age exceeds the TTL is a miss and
/// is deleted when encountered.
pub struct PersistentCache {
    root: PathBuf,
    ttl: Duration,
}

impl PersistentCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| HtmlDropError::StorageIo {
            message: format!("Failed to create resource cache directory: {}", e),
            path: Some(root.clone()),
            source: Some(e),
        })?;
        Ok(Self { root, ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Path of the cache file for a key and content type.
    pub fn path_for(&self, key: &str, content_type: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, extension_for(content_type)))
    }

    /// Read a fresh entry for `key` stored under `content_type`'s extension.
    pub fn get(&self, key: &str, content_type: &str) -> Option<Bytes> {
        if !is_valid_key(key) {
            return None;
        }
        self.read_fresh(&self.path_for(key, content_type))
    }

    /// Locate a fresh entry for `key` under any known extension.
    ///
    /// The returned content type is the canonical type for the extension found.
    pub fn find(&self, key: &str) -> Option<DiskHit> {
        if !is_valid_key(key) {
            return None;
        }
        known_extensions().into_iter().find_map(|ext| {
            let path = self.root.join(format!("{}.{}", key, ext));
            self.read_fresh(&path).map(|bytes| DiskHit {
                bytes,
                content_type: content_type_for(ext).to_string(),
            })
        })
    }

    /// Store an entry, replacing any previous file for the same key.
    ///
    /// Files left for the key under other extensions are removed so a key has
    /// at most one file.
    pub fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(HtmlDropError::invalid_input("key", "Cache key must be a hex digest"));
        }
        let ext = extension_for(content_type);
        let path = self.path_for(key, content_type);
        atomic_write_bytes(&path, bytes)?;
        debug!("Stored {} bytes in disk cache as {}", bytes.len(), path.display());

        for other in known_extensions().into_iter().filter(|other| *other != ext) {
            let sibling = self.root.join(format!("{}.{}", key, other));
            match fs::remove_file(&sibling) {
                Ok(()) => debug!("Removed superseded cache file {}", sibling.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove cache file {}: {}", sibling.display(), e),
            }
        }
        Ok(path)
    }

    /// Delete every expired file. Safe to call repeatedly.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for (path, meta) in self.entries()? {
            if self.is_expired(&meta) {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!("Failed to remove expired cache file {}: {}", path.display(), e)
                    }
                }
            }
        }
        if removed > 0 {
            info!("Removed {} expired resource cache files", removed);
        }
        Ok(removed)
    }

    /// Delete every cached file.
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for (path, _) in self.entries()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(HtmlDropError::io_with_path(e, path)),
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> TierStats {
        match self.entries() {
            Ok(entries) => TierStats {
                items: entries.len(),
                size_bytes: entries.iter().map(|(_, meta)| meta.len()).sum(),
            },
            Err(e) => {
                warn!("Failed to read resource cache directory: {}", e);
                TierStats::default()
            }
        }
    }

    // Internal methods

    fn entries(&self) -> Result<Vec<(PathBuf, fs::Metadata)>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HtmlDropError::io_with_path(e, &self.root)),
        };

        let mut entries = Vec::new();
        for entry in read_dir.filter_map(|e| e.ok()) {
            if is_temp_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    entries.push((entry.path(), meta));
                }
            }
        }
        Ok(entries)
    }

    fn is_expired(&self, meta: &fs::Metadata) -> bool {
        let Ok(modified) = meta.modified() else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age > self.ttl,
            // Modified in the future: treat as fresh.
            Err(_) => false,
        }
    }

    fn read_fresh(&self, path: &Path) -> Option<Bytes> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(_) => return None,
        };

        if self.is_expired(&meta) {
            debug!("Disk cache entry expired: {}", path.display());
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove expired cache file {}: {}", path.display(), e);
                }
            }
            return None;
        }

        match fs::read(path) {
            Ok(bytes) => Some(Bytes::from(bytes)),
            Err(e) => {
                warn!("Failed to read cache file {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::fingerprint;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn setup() -> (TempDir, PersistentCache) {
        let temp_dir = TempDir::new().unwrap();
        let cache = PersistentCache::new(temp_dir.path().join("cdn_cache"), TTL).unwrap();
        (temp_dir, cache)
    }

    fn age_file(path: &Path, age: Duration) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_put_then_get() {
        let (_tmp, cache) = setup();
        let key = fingerprint("https://cdn.jsdelivr.net/a.css");

        let path = cache.put(&key, b".a{}", "text/css").unwrap();
        assert_eq!(path.extension().unwrap(), "css");
        assert_eq!(cache.get(&key, "text/css").unwrap(), Bytes::from_static(b".a{}"));
        // Same key under a different type is a different file.
        assert!(cache.get(&key, "application/javascript").is_none());
    }

    #[test]
    fn test_unknown_type_uses_bin() {
        let (_tmp, cache) = setup();
        let key = fingerprint("https://unpkg.com/blob");
        let path = cache.put(&key, b"\x00\x01", "application/x-mystery").unwrap();
        assert_eq!(path.extension().unwrap(), "bin");
    }

    #[test]
    fn test_expired_entry_is_miss_and_deleted() {
        let (_tmp, cache) = setup();
        let key = fingerprint("https://cdn.jsdelivr.net/old.css");
        let path = cache.put(&key, b".old{}", "text/css").unwrap();

        age_file(&path, TTL + Duration::from_secs(1));

        assert!(cache.get(&key, "text/css").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_find_without_content_type() {
        let (_tmp, cache) = setup();
        let key = fingerprint("https://cdnjs.cloudflare.com/lib.js");
        cache.put(&key, b"var x = 1;", "text/javascript; charset=utf-8").unwrap();

        let hit = cache.find(&key).unwrap();
        assert_eq!(hit.bytes, Bytes::from_static(b"var x = 1;"));
        assert_eq!(hit.content_type, "application/javascript");
    }

    #[test]
    fn test_cleanup_expired_only_removes_old_files() {
        let (_tmp, cache) = setup();
        let old_key = fingerprint("https://cdn.jsdelivr.net/expired.css");
        let new_key = fingerprint("https://cdn.jsdelivr.net/fresh.css");
        let old_path = cache.put(&old_key, b".expired{}", "text/css").unwrap();
        cache.put(&new_key, b".fresh{}", "text/css").unwrap();

        age_file(&old_path, Duration::from_secs(8 * 24 * 60 * 60));

        assert_eq!(cache.cleanup_expired().unwrap(), 1);
        assert_eq!(cache.cleanup_expired().unwrap(), 0);
        assert_eq!(cache.stats().items, 1);
    }

    #[test]
    fn test_clear_and_stats() {
        let (_tmp, cache) = setup();
        cache
            .put(&fingerprint("https://unpkg.com/a.js"), b"12345", "application/javascript")
            .unwrap();
        cache
            .put(&fingerprint("https://unpkg.com/b.css"), b"123", "text/css")
            .unwrap();

        let stats = cache.stats();
        assert_eq!(stats.items, 2);
        assert_eq!(stats.size_bytes, 8);

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.stats(), TierStats::default());
    }

    #[test]
    fn test_put_replaces_file_under_other_extension() {
        let (_tmp, cache) = setup();
        let key = fingerprint("https://cdn.jsdelivr.net/npm/x/style.css");

        let css = cache.put(&key, b".v1{}", "text/css").unwrap();
        let bin = cache.put(&key, b".v2{}", "text/plain").unwrap();

        assert_eq!(bin.extension().unwrap(), "bin");
        assert!(!css.exists());
        assert_eq!(cache.stats().items, 1);
        assert_eq!(cache.find(&key).unwrap().bytes, Bytes::from_static(b".v2{}"));

        cache.put(&key, b".v3{}", "text/css").unwrap();
        assert!(!bin.exists());
        assert_eq!(cache.stats().items, 1);
    }

    #[test]
    fn test_rejects_non_digest_keys() {
        let (_tmp, cache) = setup();
        assert!(cache.put("../escape", b"x", "text/css").is_err());
        assert!(cache.get("../escape", "text/css").is_none());
        assert!(cache.find("../escape").is_none());
    }
}
