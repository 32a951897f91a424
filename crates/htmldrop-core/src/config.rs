//! Centralized configuration for HTML Drop.
//!
//! Fixed tunables live in the constant structs below. Operator-controlled
//! values are collected into [`Settings`], which is read from the environment
//! once at startup.

use crate::error::{HtmlDropError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const MAX_RESOURCE_BYTES: u64 = 10 * 1024 * 1024;
    pub const FETCH_CHUNK_SIZE: usize = 8192;
    pub const USER_AGENT: &'static str = "HtmlDrop-Proxy/1.0";
    pub const DEFAULT_CONTENT_TYPE: &'static str = "application/octet-stream";
    pub const BROWSER_CACHE_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
}

/// Resource cache configuration.
pub struct CacheConfig;

impl CacheConfig {
    pub const MEMORY_CAPACITY: usize = 100;
    pub const DISK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
    pub const LISTING_TTL: Duration = Duration::from_secs(300);
    pub const FALLBACK_EXTENSION: &'static str = "bin";
    pub const TEMP_PREFIX: &'static str = ".partial-";
}

/// Project storage configuration.
pub struct ProjectConfig;

impl ProjectConfig {
    pub const ID_LENGTH: usize = 8;
    pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
    pub const STORAGE_QUOTA_BYTES: u64 = 500 * 1024 * 1024;
    pub const EXPIRY_DAYS: u64 = 30;
    pub const CLEANUP_INTERVAL_HOURS: u64 = 24;
    pub const DESCRIPTION_MAX_CHARS: usize = 100;
    pub const UNTITLED: &'static str = "Untitled Project";
    pub const NO_DESCRIPTION: &'static str = "No description";
    pub const DEFAULT_PER_PAGE: usize = 20;
    pub const MAX_PER_PAGE: usize = 100;
}

/// Shared directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const PROJECTS_DIR_NAME: &'static str = "static";
    pub const RESOURCE_CACHE_DIR_NAME: &'static str = "cdn_cache";
    pub const HTML_FILENAME: &'static str = "index.html";
    pub const THUMBNAIL_FILENAME: &'static str = "thumbnail.png";
    pub const METADATA_FILENAME: &'static str = "metadata.json";
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Operator-controlled settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Public base URL used to build project links.
    pub host_url: String,
    /// Root under which project and cache directories are created.
    pub data_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub max_resource_bytes: u64,
    pub storage_quota_bytes: u64,
    pub resource_cache_ttl: Duration,
    pub memory_cache_capacity: usize,
    pub fetch_timeout: Duration,
    pub listing_cache_ttl: Duration,
    pub project_expiry: Duration,
    pub cleanup_interval: Duration,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        let port = 5010;
        Self {
            host: "0.0.0.0".to_string(),
            port,
            host_url: format!("http://127.0.0.1:{}", port),
            data_dir: PathBuf::from("."),
            max_upload_bytes: ProjectConfig::MAX_UPLOAD_BYTES,
            max_resource_bytes: NetworkConfig::MAX_RESOURCE_BYTES,
            storage_quota_bytes: ProjectConfig::STORAGE_QUOTA_BYTES,
            resource_cache_ttl: CacheConfig::DISK_TTL,
            memory_cache_capacity: CacheConfig::MEMORY_CAPACITY,
            fetch_timeout: NetworkConfig::FETCH_TIMEOUT,
            listing_cache_ttl: CacheConfig::LISTING_TTL,
            project_expiry: days(ProjectConfig::EXPIRY_DAYS),
            cleanup_interval: hours(ProjectConfig::CLEANUP_INTERVAL_HOURS),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Unset keys keep their defaults; malformed values are a `Config` error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(host) = lookup("HOST") {
            settings.host = host;
        }
        if let Some(port) = parse_var(&lookup, "PORT")? {
            settings.port = port;
        }
        settings.host_url = normalize_host_url(
            lookup("HOST_URL").unwrap_or_else(|| format!("http://127.0.0.1:{}", settings.port)),
        );
        if let Some(dir) = lookup("DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_var(&lookup, "MAX_UPLOAD_BYTES")? {
            settings.max_upload_bytes = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_RESOURCE_BYTES")? {
            settings.max_resource_bytes = v;
        }
        if let Some(v) = parse_var(&lookup, "STORAGE_QUOTA_BYTES")? {
            settings.storage_quota_bytes = v;
        }
        if let Some(v) = parse_var(&lookup, "RESOURCE_CACHE_TTL_SECS")? {
            settings.resource_cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "MEMORY_CACHE_CAPACITY")? {
            if v == 0 {
                return Err(HtmlDropError::Config {
                    message: "MEMORY_CACHE_CAPACITY must be at least 1".to_string(),
                });
            }
            settings.memory_cache_capacity = v;
        }
        if let Some(v) = parse_var(&lookup, "FETCH_TIMEOUT_SECS")? {
            settings.fetch_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "LISTING_CACHE_TTL_SECS")? {
            settings.listing_cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = parse_var(&lookup, "PROJECT_EXPIRY_DAYS")? {
            settings.project_expiry = days(v);
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "CLEANUP_INTERVAL_HOURS")? {
            if v == 0 {
                return Err(HtmlDropError::Config {
                    message: "CLEANUP_INTERVAL_HOURS must be at least 1".to_string(),
                });
            }
            settings.cleanup_interval = hours(v);
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            settings.log_format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "compact" | "text" => LogFormat::Pretty,
                other => {
                    return Err(HtmlDropError::Config {
                        message: format!("Unknown LOG_FORMAT: {}", other),
                    })
                }
            };
        }

        Ok(settings)
    }

    /// Directory holding one subdirectory per project.
    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::PROJECTS_DIR_NAME)
    }

    /// Directory holding persisted proxy resources.
    pub fn resource_cache_dir(&self) -> PathBuf {
        self.data_dir.join(PathsConfig::RESOURCE_CACHE_DIR_NAME)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| HtmlDropError::Config {
                message: format!("{} has an invalid value: {:?}", key, raw),
            }),
    }
}

/// Ensure the public base URL has a scheme and no trailing slash.
pub fn normalize_host_url(raw: String) -> String {
    let url = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw
    } else {
        format!("https://{}", raw)
    };
    url.trim_end_matches('/').to_string()
}

fn days(n: u64) -> Duration {
    Duration::from_secs(n * 24 * 60 * 60)
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n * 60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.port, 5010);
        assert_eq!(settings.host_url, "http://127.0.0.1:5010");
        assert_eq!(settings.memory_cache_capacity, 100);
        assert_eq!(settings.max_resource_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.storage_quota_bytes, 500 * 1024 * 1024);
        assert_eq!(settings.resource_cache_ttl, Duration::from_secs(604_800));
        assert_eq!(settings.project_expiry, Duration::from_secs(30 * 86_400));
        assert_eq!(settings.cleanup_interval, Duration::from_secs(86_400));
        assert_eq!(settings.listing_cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST_URL", "drop.example.com/"),
            ("MEMORY_CACHE_CAPACITY", "5"),
            ("PROJECT_EXPIRY_DAYS", "7"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host_url, "https://drop.example.com");
        assert_eq!(settings.memory_cache_capacity, 5);
        assert_eq!(settings.project_expiry, Duration::from_secs(7 * 86_400));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_value_is_config_error() {
        let result = Settings::from_lookup(lookup_from(&[("STORAGE_QUOTA_BYTES", "lots")]));
        assert!(matches!(result, Err(HtmlDropError::Config { .. })));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Settings::from_lookup(lookup_from(&[("MEMORY_CACHE_CAPACITY", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_directory_layout() {
        let settings = Settings::from_lookup(lookup_from(&[("DATA_DIR", "/srv/drop")])).unwrap();
        assert_eq!(settings.projects_dir(), PathBuf::from("/srv/drop/static"));
        assert_eq!(
            settings.resource_cache_dir(),
            PathBuf::from("/srv/drop/cdn_cache")
        );
    }
}
