//! Resource cache entry and statistics types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached third-party resource.
///
/// Entries are immutable once inserted. `bytes` is reference-counted, so
/// handing an entry to a response never copies the payload.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    /// Fingerprint of the origin URL.
    pub key: String,
    pub bytes: Bytes,
    pub content_type: String,
    pub inserted_at: DateTime<Utc>,
}

impl ResourceEntry {
    pub fn new(key: impl Into<String>, bytes: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            bytes,
            content_type: content_type.into(),
            inserted_at: Utc::now(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Which tier answered a proxy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    #[serde(rename = "HIT-MEMORY")]
    HitMemory,
    #[serde(rename = "HIT-DISK")]
    HitDisk,
    #[serde(rename = "MISS")]
    Miss,
}

impl CacheStatus {
    /// Header value for the cache-status indicator.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::HitMemory => "HIT-MEMORY",
            CacheStatus::HitDisk => "HIT-DISK",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Item count and payload size for one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub items: usize,
    pub size_bytes: u64,
}

/// Statistics across both resource cache tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCacheStats {
    #[serde(rename = "memory_cache")]
    pub memory: TierStats,
    #[serde(rename = "file_cache")]
    pub disk: TierStats,
    pub total: TierStats,
}

impl ResourceCacheStats {
    pub fn new(memory: TierStats, disk: TierStats) -> Self {
        Self {
            memory,
            disk,
            total: TierStats {
                items: memory.items + disk.items,
                size_bytes: memory.size_bytes + disk.size_bytes,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_status_strings() {
        assert_eq!(CacheStatus::HitMemory.as_str(), "HIT-MEMORY");
        assert_eq!(CacheStatus::HitDisk.to_string(), "HIT-DISK");
        assert_eq!(
            serde_json::to_value(CacheStatus::Miss).unwrap(),
            serde_json::json!("MISS")
        );
    }

    #[test]
    fn test_stats_totals() {
        let stats = ResourceCacheStats::new(
            TierStats {
                items: 1,
                size_bytes: 20,
            },
            TierStats {
                items: 1,
                size_bytes: 20,
            },
        );
        assert_eq!(stats.total.items, 2);
        assert_eq!(stats.total.size_bytes, 40);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["memory_cache"]["items"], 1);
        assert_eq!(json["file_cache"]["size_bytes"], 20);
    }
}
