//! Resource proxy operations.

use crate::cache::ResourceCacheStats;
use crate::error::Result;
use crate::proxy::{ClearReport, ProxiedResource};
use crate::HtmlDrop;

impl HtmlDrop {
    /// Serve an allow-listed third-party resource through the cache tiers.
    pub async fn proxy_resource(&self, url: &str) -> Result<ProxiedResource> {
        self.proxy.proxy(url).await
    }

    pub fn cache_stats(&self) -> ResourceCacheStats {
        self.proxy.stats()
    }

    /// Drop both resource cache tiers.
    pub fn clear_cache(&self) -> Result<ClearReport> {
        self.proxy.clear()
    }

    /// Drop only the in-memory tier.
    pub fn clear_memory_cache(&self) -> usize {
        self.proxy.clear_memory()
    }

    /// Remove expired persistent cache files.
    pub fn cleanup_cache(&self) -> Result<usize> {
        self.proxy.cleanup()
    }
}
