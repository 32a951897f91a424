//! Static content-type to file-extension mapping for the disk tier.

use crate::config::{CacheConfig, NetworkConfig};

/// MIME essence to extension. Several types may share one extension; the
/// first row for an extension is its canonical type.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("text/css", "css"),
    ("application/javascript", "js"),
    ("text/javascript", "js"),
    ("application/x-javascript", "js"),
    ("application/json", "json"),
    ("font/woff2", "woff2"),
    ("font/woff", "woff"),
    ("application/font-woff", "woff"),
    ("font/ttf", "ttf"),
    ("application/x-font-ttf", "ttf"),
    ("font/otf", "otf"),
    ("application/vnd.ms-fontobject", "eot"),
    ("image/svg+xml", "svg"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/x-icon", "ico"),
    ("text/html", "html"),
];

/// Strip parameters and case from a content-type header value.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Pick the cache file extension for a content type.
///
/// Unrecognized types fall back to the generic binary extension.
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = essence(content_type);
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .unwrap_or(CacheConfig::FALLBACK_EXTENSION)
}

/// Canonical content type for a cache file extension.
pub fn content_type_for(extension: &str) -> &'static str {
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(_, ext)| *ext == extension)
        .map(|(mime, _)| *mime)
        .unwrap_or(NetworkConfig::DEFAULT_CONTENT_TYPE)
}

/// Every extension the disk tier may use, fallback included, without duplicates.
pub fn known_extensions() -> Vec<&'static str> {
    let mut extensions: Vec<&'static str> = Vec::new();
    for (_, ext) in CONTENT_TYPE_EXTENSIONS {
        if !extensions.contains(ext) {
            extensions.push(ext);
        }
    }
    extensions.push(CacheConfig::FALLBACK_EXTENSION);
    extensions
}
