//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running yt-dlp or FFmpeg.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("{tool} timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} failed: {message}")]
    CommandFailed {
        tool: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("No captions available: {0}")]
    CaptionsUnavailable(String),

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn timeout(tool: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            tool: tool.into(),
            secs,
        }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the failure was a subprocess hitting its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MediaError::Timeout { .. })
    }
}
