//! Clip records and time range resolution.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{Highlight, TransitionError};

/// Unique identifier for a clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClipStatus {
    #[default]
    Processing,
    /// Rendered and downloadable
    Ready,
    Error,
}

impl ClipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStatus::Processing => "processing",
            ClipStatus::Ready => "ready",
            ClipStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ClipStatus::Ready | ClipStatus::Error)
    }
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome applied to a processing clip.
#[derive(Debug, Clone)]
pub enum ClipResolution {
    Ready { download_url: String },
    Failed { message: String },
}

impl ClipResolution {
    pub fn ready(download_url: impl Into<String>) -> Self {
        Self::Ready {
            download_url: download_url.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn target_status(&self) -> ClipStatus {
        match self {
            ClipResolution::Ready { .. } => ClipStatus::Ready,
            ClipResolution::Failed { .. } => ClipStatus::Error,
        }
    }
}

/// One rendered sub-segment of a source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Clip {
    pub id: ClipId,

    /// Highlight the clip was requested from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_id: Option<String>,

    pub source_id: String,

    /// Start, inclusive seconds
    pub start_time: u32,

    /// End, exclusive seconds
    pub end_time: u32,

    pub status: ClipStatus,

    /// Present only once the clip is ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Clip {
    /// Create a new processing clip.
    pub fn new(
        source_id: impl Into<String>,
        start_time: u32,
        end_time: u32,
        highlight_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ClipId::new(),
            highlight_id,
            source_id: source_id.into(),
            start_time,
            end_time,
            status: ClipStatus::Processing,
            download_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn duration_secs(&self) -> u32 {
        self.end_time.saturating_sub(self.start_time)
    }

    pub fn source_url(&self) -> String {
        crate::watch_url(&self.source_id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a terminal resolution.
    ///
    /// Fails without touching the record if it has already been resolved.
    pub fn apply(&mut self, resolution: ClipResolution) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyResolved {
                kind: "clip",
                id: self.id.to_string(),
                status: self.status.as_str(),
            });
        }

        match resolution {
            ClipResolution::Ready { download_url } => {
                self.status = ClipStatus::Ready;
                self.download_url = Some(download_url);
            }
            ClipResolution::Failed { message } => {
                self.status = ClipStatus::Error;
                self.error_message = Some(message);
            }
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn resolved(mut self, resolution: ClipResolution) -> Result<Self, TransitionError> {
        self.apply(resolution)?;
        Ok(self)
    }
}

/// Why a clip time range could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    #[error("start_time and end_time are required when no highlight is referenced")]
    Missing,

    #[error("end_time ({end}) must be greater than start_time ({start})")]
    Inverted { start: u32, end: u32 },
}

/// Resolve clip bounds from explicit times, falling back to a highlight.
///
/// Explicit values win individually over the highlight's bounds.
pub fn resolve_time_range(
    start_time: Option<u32>,
    end_time: Option<u32>,
    highlight: Option<&Highlight>,
) -> Result<(u32, u32), TimeRangeError> {
    let start = start_time.or(highlight.map(|h| h.start_timestamp));
    let end = end_time.or(highlight.map(|h| h.end_timestamp));

    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok((start, end)),
        (Some(start), Some(end)) => Err(TimeRangeError::Inverted { start, end }),
        _ => Err(TimeRangeError::Missing),
    }
}
