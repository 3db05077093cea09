//! Registry error types.

use clipgen_models::TransitionError;
use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while reading or writing job and clip records.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    AlreadyResolved(#[from] TransitionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map an HTTP error status from the row store.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => Self::NotFound(message),
            429 => Self::RateLimited(1000),
            500..=599 => Self::ServerError(status, message),
            _ => Self::RequestFailed(message),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::Network(_) | RegistryError::RateLimited(_) | RegistryError::ServerError(..)
        )
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            RegistryError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// HTTP status used when recording metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RegistryError::NotFound(_) => Some(404),
            RegistryError::AlreadyResolved(_) => Some(409),
            RegistryError::RateLimited(_) => Some(429),
            RegistryError::ServerError(status, _) => Some(*status),
            RegistryError::RequestFailed(_) => Some(400),
            _ => None,
        }
    }
}
