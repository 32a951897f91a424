//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Derive the cache key for a resource URL.
///
/// The key is the lowercase hex SHA-256 of the exact URL string (64 chars).
/// No normalization is applied: URLs that differ by a trailing slash or
/// query order are distinct resources.
pub fn fingerprint(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
