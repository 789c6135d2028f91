//! Error types for the directory API client.

use thiserror::Error;

/// Result type alias using [`DirectoryError`].
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur when talking to the directory API.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested object does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The object already exists or the edge is already present (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The API asked us to slow down (HTTP 429).
    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other API error, carried with its HTTP status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// An operation exhausted its retry budget.
    #[error("Maximum retries ({attempts}) exceeded: {message}")]
    MaxRetriesExceeded { attempts: u32, message: String },
}

impl DirectoryError {
    /// Whether this error means the target object is absent remotely.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error indicates an already-converged edge mutation.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Whether the error is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::RateLimited { .. })
    }

    /// Whether the error is a server-side (5xx) failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }
}
