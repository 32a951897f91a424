//! In-memory LRU tier.

use super::types::{ResourceEntry, TierStats};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Bounded, recency-ordered resource cache.
///
/// Capacity is an entry count; there is no TTL at this tier. A hit or an
/// insert moves the entry to the most-recently-used end, and inserting into a
/// full cache evicts the least-recently-used entry. One mutex guards the whole
/// structure.
pub struct VolatileCache {
    entries: Mutex<LruCache<String, ResourceEntry>>,
}

impl VolatileCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, ResourceEntry>> {
        // Entries are immutable, so a poisoned lock still guards consistent data.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up an entry, promoting it on hit.
    pub fn get(&self, key: &str) -> Option<ResourceEntry> {
        self.lock().get(key).cloned()
    }

    /// Insert an entry, evicting the least-recently-used one when full.
    pub fn put(&self, entry: ResourceEntry) {
        let key = entry.key.clone();
        if let Some((evicted, _)) = self.lock().push(key.clone(), entry) {
            if evicted != key {
                debug!("Evicted {} from memory cache", evicted);
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    /// Drop every entry, returning how many were held.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn stats(&self) -> TierStats {
        let entries = self.lock();
        TierStats {
            items: entries.len(),
            size_bytes: entries.iter().map(|(_, e)| e.size_bytes()).sum(),
        }
    }
}
