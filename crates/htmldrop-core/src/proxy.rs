//! Resource proxy orchestration.
//!
//! A request runs through the allow-list, the volatile tier, the persistent
//! tier and finally the fetcher, stopping at the first that answers. A fresh
//! fetch populates both tiers. Cache write failures are logged and the fetched
//! bytes are still returned.

use crate::cache::{
    fingerprint, CacheStatus, DiskHit, PersistentCache, ResourceCacheStats, ResourceEntry,
    VolatileCache,
};
use crate::config::NetworkConfig;
use crate::error::{HtmlDropError, Result};
use crate::network::{DynFetcher, OriginAllowList};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// A proxied resource and the tier that produced it.
#[derive(Debug, Clone)]
pub struct ProxiedResource {
    pub bytes: Bytes,
    pub content_type: String,
    pub status: CacheStatus,
}

/// Counts from dropping both tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    pub memory_cleared: usize,
    pub files_cleared: usize,
}

type FlightMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Two-tier caching proxy for allow-listed third-party resources.
pub struct ResourceProxy {
    allow_list: OriginAllowList,
    memory: VolatileCache,
    disk: PersistentCache,
    fetcher: DynFetcher,
    max_bytes: u64,
    fetch_timeout: Duration,
    /// One lock per fingerprint with a miss in progress.
    in_flight: FlightMap,
}

impl ResourceProxy {
    pub fn new(
        allow_list: OriginAllowList,
        memory: VolatileCache,
        disk: PersistentCache,
        fetcher: DynFetcher,
        max_bytes: u64,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            allow_list,
            memory,
            disk,
            fetcher,
            max_bytes,
            fetch_timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Serve `url` from the cheapest tier that has it.
    pub async fn proxy(&self, url: &str) -> Result<ProxiedResource> {
        let url = url.trim();
        if url.is_empty() {
            return Err(HtmlDropError::invalid_input("url", "URL parameter is required"));
        }
        if !self.allow_list.is_allowed(url) {
            warn!("Blocked proxy request for non-allow-listed URL: {}", url);
            return Err(HtmlDropError::Forbidden {
                reason: "Domain not allowed".to_string(),
            });
        }
        validate_absolute_http(url)?;

        let key = fingerprint(url);
        if let Some(hit) = self.from_memory(&key) {
            return Ok(hit);
        }

        let slot = FlightSlot::join(&self.in_flight, &key);
        let _guard = slot.wait().await;

        // Another request may have filled the cache while we waited.
        if let Some(hit) = self.from_memory(&key) {
            return Ok(hit);
        }
        if let Some(hit) = self.from_disk(url, &key).await {
            self.memory
                .put(ResourceEntry::new(&key, hit.bytes.clone(), &hit.content_type));
            debug!("Disk cache hit for {}", url);
            return Ok(ProxiedResource {
                bytes: hit.bytes,
                content_type: hit.content_type,
                status: CacheStatus::HitDisk,
            });
        }

        debug!("Cache miss for {}, fetching", url);
        let fetched = self
            .fetcher
            .fetch(url, self.max_bytes, self.fetch_timeout)
            .await?;

        self.memory.put(ResourceEntry::new(
            &key,
            fetched.bytes.clone(),
            &fetched.content_type,
        ));
        if let Err(e) = self.disk.put(&key, &fetched.bytes, &fetched.content_type) {
            warn!("Failed to persist {} to disk cache: {}", url, e);
        }

        Ok(ProxiedResource {
            bytes: fetched.bytes,
            content_type: fetched.content_type,
            status: CacheStatus::Miss,
        })
    }

    pub fn stats(&self) -> ResourceCacheStats {
        ResourceCacheStats::new(self.memory.stats(), self.disk.stats())
    }

    /// Drop every entry from both tiers.
    pub fn clear(&self) -> Result<ClearReport> {
        let memory_cleared = self.memory.clear();
        let files_cleared = self.disk.clear()?;
        info!(
            "Cleared resource cache: {} memory entries, {} files",
            memory_cleared, files_cleared
        );
        Ok(ClearReport {
            memory_cleared,
            files_cleared,
        })
    }

    /// Drop the volatile tier only.
    pub fn clear_memory(&self) -> usize {
        self.memory.clear()
    }

    /// Remove expired files from the persistent tier.
    pub fn cleanup(&self) -> Result<usize> {
        self.disk.cleanup_expired()
    }

    // Internal methods

    fn from_memory(&self, key: &str) -> Option<ProxiedResource> {
        self.memory.get(key).map(|entry| ProxiedResource {
            bytes: entry.bytes,
            content_type: entry.content_type,
            status: CacheStatus::HitMemory,
        })
    }

    /// The disk file name depends on the content type, which only the origin
    /// knows. Probe it first; when the probe fails or names another type,
    /// search by fingerprint.
    async fn from_disk(&self, url: &str, key: &str) -> Option<DiskHit> {
        let probe_timeout = self.fetch_timeout.min(NetworkConfig::PROBE_TIMEOUT);
        match self.fetcher.probe_content_type(url, probe_timeout).await {
            // HEAD and GET can disagree on the type; fall back to the scan.
            Ok(content_type) => match self.disk.get(key, &content_type) {
                Some(bytes) => Some(DiskHit {
                    bytes,
                    content_type,
                }),
                None => self.disk.find(key),
            },
            Err(e) => {
                debug!("Content-type probe failed for {}: {}; scanning disk cache", url, e);
                self.disk.find(key)
            }
        }
    }
}

fn validate_absolute_http(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| HtmlDropError::invalid_input("url", format!("Invalid URL: {}", e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(HtmlDropError::invalid_input(
            "url",
            format!("Unsupported URL scheme: {}", other),
        )),
    }
}

/// Membership in the per-fingerprint lock map.
///
/// The map entry is removed when the last member leaves, including when a
/// request future is dropped mid-flight.
struct FlightSlot<'a> {
    flights: &'a FlightMap,
    key: &'a str,
    /// Taken in `drop` so the count check runs after this reference is gone.
    lock: Option<Arc<AsyncMutex<()>>>,
}

impl<'a> FlightSlot<'a> {
    fn join(flights: &'a FlightMap, key: &'a str) -> Self {
        let lock = lock_flights(flights)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        Self {
            flights,
            key,
            lock: Some(lock),
        }
    }

    async fn wait(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut flights = lock_flights(self.flights);
        if let Some(lock) = self.lock.take() {
            // Held only by the map and this slot.
            if Arc::strong_count(&lock) == 2 {
                flights.remove(self.key);
            }
            // `lock` is released here, before the map guard.
        }
    }
}

fn lock_flights(flights: &FlightMap) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
    flights.lock().unwrap_or_else(|e| e.into_inner())
}
