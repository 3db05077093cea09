//! Analysis job records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Highlight, TransitionError};

/// Unique identifier for an analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an analysis job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Analysis dispatched, waiting for completion
    #[default]
    Processing,
    /// Highlights are available
    Complete,
    /// Analysis failed; see `error_message`
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome applied to a processing job.
#[derive(Debug, Clone)]
pub enum JobResolution {
    Complete {
        highlights: Vec<Highlight>,
        /// Replaces the placeholder title when metadata lookup found a real one
        video_title: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl JobResolution {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn target_status(&self) -> JobStatus {
        match self {
            JobResolution::Complete { .. } => JobStatus::Complete,
            JobResolution::Failed { .. } => JobStatus::Error,
        }
    }
}

/// One analysis request for a source video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// YouTube video ID the job analyzes (not unique across jobs)
    pub source_id: String,

    /// Canonical watch URL
    pub source_url: String,

    /// Display title
    pub video_title: String,

    pub status: JobStatus,

    /// Present only once the job is complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<Highlight>>,

    /// Present only once the job has failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new processing job for a source video.
    pub fn new(source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let now = Utc::now();

        Self {
            id: JobId::new(),
            source_url: crate::watch_url(&source_id),
            video_title: placeholder_title(&source_id),
            source_id,
            status: JobStatus::Processing,
            highlights: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a terminal resolution.
    ///
    /// Fails without touching the record if it has already been resolved.
    pub fn apply(&mut self, resolution: JobResolution) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadyResolved {
                kind: "job",
                id: self.id.to_string(),
                status: self.status.as_str(),
            });
        }

        let now = Utc::now();
        match resolution {
            JobResolution::Complete {
                highlights,
                video_title,
            } => {
                self.status = JobStatus::Complete;
                self.highlights = Some(highlights);
                if let Some(title) = video_title.filter(|t| !t.trim().is_empty()) {
                    self.video_title = title;
                }
            }
            JobResolution::Failed { message } => {
                self.status = JobStatus::Error;
                self.error_message = Some(message);
            }
        }
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Apply a resolution, consuming the job.
    pub fn resolved(mut self, resolution: JobResolution) -> Result<Self, TransitionError> {
        self.apply(resolution)?;
        Ok(self)
    }
}

/// Title shown until the metadata probe supplies the real one.
pub fn placeholder_title(source_id: &str) -> String {
    format!("YouTube Video ({})", source_id)
}
