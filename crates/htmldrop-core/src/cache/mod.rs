//! Two-tier cache for proxied third-party resources.
//!
//! - [`VolatileCache`]: bounded in-memory LRU, lost on restart
//! - [`PersistentCache`]: one file per resource on disk, expired by age
//!
//! Both tiers are keyed by [`fingerprint`] and hold independent copies of
//! each entry.

pub mod content_type;
mod disk;
mod fingerprint;
mod memory;
mod types;

pub use disk::{DiskHit, PersistentCache};
pub use fingerprint::fingerprint;
pub use memory::VolatileCache;
pub use types::{CacheStatus, ResourceCacheStats, ResourceEntry, TierStats};
