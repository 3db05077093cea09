//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A required R2 variable is missing or malformed
    #[error("R2 misconfigured: {0}")]
    ConfigError(String),

    #[error("Clip artifact not found: {0}")]
    NotFound(String),

    #[error("Clip upload failed: {0}")]
    UploadFailed(String),

    #[error("Could not sign download link: {0}")]
    PresignFailed(String),

    /// Clip ids become file names and object keys
    #[error("Clip id not usable as a key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("R2 request failed: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    /// Missing files are expected while a clip is still rendering.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
