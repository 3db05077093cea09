//! Worker error types.

use clipgen_media::MediaError;
use clipgen_models::{SourceIdError, TimeRangeError, TransitionError};
use clipgen_registry::RegistryError;
use clipgen_storage::StorageError;
use clipgen_workflow::WorkflowError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid YouTube URL. Please provide a valid YouTube video link.")]
    InvalidSource(#[from] SourceIdError),

    #[error("Either provide start_time/end_time or a valid highlight_id")]
    MissingTimeRange,

    #[error("video_id is required unless highlight_id refers to an existing highlight")]
    MissingSource,

    #[error("end_time ({end}) must be greater than start_time ({start})")]
    InvalidTimeRange { start: u32, end: u32 },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    AlreadyResolved(TransitionError),

    #[error("No transcript found for this video. It might not have captions.")]
    NoCaptionsAvailable,

    /// Caption fetch failed; carries the user-facing message
    #[error("{0}")]
    Captions(String),

    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Workflow engine error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Registry error: {0}")]
    Registry(RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RegistryError> for WorkerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(what) => Self::NotFound(format!("Not found: {}", what)),
            RegistryError::AlreadyResolved(t) => Self::AlreadyResolved(t),
            other => Self::Registry(other),
        }
    }
}

impl From<TimeRangeError> for WorkerError {
    fn from(err: TimeRangeError) -> Self {
        match err {
            TimeRangeError::Missing => Self::MissingTimeRange,
            TimeRangeError::Inverted { start, end } => Self::InvalidTimeRange { start, end },
        }
    }
}

impl WorkerError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Map a caption fetch failure to the message shown to users.
    ///
    /// Only yt-dlp's own stderr is inspected for the video's state. Missing
    /// tools, files and IO errors are fetch failures, never "no captions".
    pub fn from_caption_failure(err: MediaError) -> Self {
        let stderr = match &err {
            MediaError::CaptionsUnavailable(_) => return Self::NoCaptionsAvailable,
            MediaError::CommandFailed { message, .. } => message.to_lowercase(),
            _ => return Self::Captions(format!("Failed to fetch transcript: {}", err)),
        };

        if stderr.contains("disabled") {
            Self::Captions("Transcripts are disabled for this video.".to_string())
        } else if stderr.contains("no transcript")
            || stderr.contains("no subtitles")
            || stderr.contains("there are no")
        {
            Self::NoCaptionsAvailable
        } else if stderr.contains("unavailable") || stderr.contains("private") {
            Self::Captions("Video is unavailable. It might be private or deleted.".to_string())
        } else {
            Self::Captions(format!("Failed to fetch transcript: {}", err))
        }
    }

    /// Whether the caller sent a bad request (as opposed to a failure on our side).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkerError::InvalidSource(_)
                | WorkerError::MissingSource
                | WorkerError::MissingTimeRange
                | WorkerError::InvalidTimeRange { .. }
        )
    }

    /// Message written into a record's `error_message`.
    pub fn user_message(&self) -> String {
        match self {
            WorkerError::Media(e) => clipgen_media::failure_message(e),
            WorkerError::Workflow(e) => format!("Workflow engine request failed: {}", e),
            WorkerError::Storage(e) => format!("Failed to publish clip: {}", e),
            other => other.to_string(),
        }
    }
}
