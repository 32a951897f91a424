//! Error types for HTML Drop.
//!
//! Every failure the core can surface maps to one variant here. Callers at the
//! HTTP boundary use [`HtmlDropError::status_code`] and
//! [`HtmlDropError::public_message`] so internal paths never leak into responses.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the HTML Drop core.
#[derive(Debug, Error)]
pub enum HtmlDropError {
    // Request validation errors
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Project not found: {project_id}")]
    NotFound { project_id: String },

    #[error("Payload too large: limit is {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: u64 },

    // Upstream (proxied resource) errors
    #[error("Upstream request timed out after {0:?}")]
    UpstreamTimeout(std::time::Duration),

    #[error("Upstream request failed for {url}: {message}")]
    UpstreamUnavailable { url: String, message: String },

    // Storage errors
    #[error("Storage quota exceeded: {used_bytes} of {quota_bytes} bytes used")]
    QuotaExceeded { used_bytes: u64, quota_bytes: u64 },

    #[error("Storage IO error at {path:?}: {message}")]
    StorageIo {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Internal(String),
}

/// Result type alias for HTML Drop operations.
pub type Result<T> = std::result::Result<T, HtmlDropError>;

impl From<std::io::Error> for HtmlDropError {
    fn from(err: std::io::Error) -> Self {
        HtmlDropError::StorageIo {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for HtmlDropError {
    fn from(err: serde_json::Error) -> Self {
        HtmlDropError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for HtmlDropError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HtmlDropError::UpstreamTimeout(std::time::Duration::from_secs(0))
        } else {
            HtmlDropError::UpstreamUnavailable {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.to_string(),
            }
        }
    }
}

impl HtmlDropError {
    /// Create a storage error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        HtmlDropError::StorageIo {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Shorthand for an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        HtmlDropError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map to the HTTP status code the boundary should answer with.
    ///
    /// - 400: missing or malformed input
    /// - 403: origin not allow-listed or path escape
    /// - 404: unknown project
    /// - 413: upload or proxied resource over its ceiling
    /// - 502: upstream transport failure
    /// - 504: upstream timeout
    /// - 507: storage quota exhausted
    /// - 500: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            HtmlDropError::InvalidInput { .. } => 400,
            HtmlDropError::Forbidden { .. } => 403,
            HtmlDropError::NotFound { .. } => 404,
            HtmlDropError::PayloadTooLarge { .. } => 413,
            HtmlDropError::UpstreamUnavailable { .. } => 502,
            HtmlDropError::UpstreamTimeout(_) => 504,
            HtmlDropError::QuotaExceeded { .. } => 507,
            HtmlDropError::StorageIo { .. }
            | HtmlDropError::Json { .. }
            | HtmlDropError::Config { .. }
            | HtmlDropError::Internal(_) => 500,
        }
    }

    /// Message safe to return to a caller.
    ///
    /// Storage and internal failures collapse to a generic message; the
    /// detailed `Display` form belongs in the operational log only.
    pub fn public_message(&self) -> String {
        match self {
            HtmlDropError::InvalidInput { message, .. } => message.clone(),
            HtmlDropError::Forbidden { reason } => reason.clone(),
            HtmlDropError::NotFound { .. } => "Project not found".to_string(),
            HtmlDropError::PayloadTooLarge { limit_bytes } => {
                format!("Payload exceeds the {} byte limit", limit_bytes)
            }
            HtmlDropError::UpstreamTimeout(_) => "Upstream request timed out".to_string(),
            HtmlDropError::UpstreamUnavailable { .. } => "Upstream request failed".to_string(),
            HtmlDropError::QuotaExceeded { .. } => "Storage quota exceeded".to_string(),
            HtmlDropError::StorageIo { .. }
            | HtmlDropError::Json { .. }
            | HtmlDropError::Config { .. }
            | HtmlDropError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Whether this error is an internal fault rather than a caller-visible outcome.
    pub fn is_internal(&self) -> bool {
        self.status_code() == 500
    }
}
