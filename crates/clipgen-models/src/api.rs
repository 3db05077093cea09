//! Request and response bodies of the HTTP API.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{Clip, ClipStatus, Highlight, Job, JobStatus};

/// Body of `POST /api/analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeRequest {
    pub youtube_url: String,
}

/// Body of `POST /api/clips`.
///
/// Either both times or a `highlight_id` must be given; explicit times
/// override the highlight's bounds individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClipRequest {
    #[serde(default)]
    pub video_id: Option<String>,

    #[serde(default)]
    pub highlight_id: Option<String>,

    /// Whole seconds
    #[serde(default)]
    pub start_time: Option<u32>,

    /// Whole seconds, exclusive
    #[serde(default)]
    pub end_time: Option<u32>,
}

/// Job payload returned by analyze, polling and results lookup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobResponse {
    pub status: JobStatus,

    pub job_id: String,

    pub video_id: String,

    pub video_title: String,

    /// True when an earlier completed analysis was returned
    #[serde(default)]
    pub cached: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<Highlight>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobResponse {
    pub fn from_job(job: Job, cached: bool) -> Self {
        Self {
            status: job.status,
            job_id: job.id.0,
            video_id: job.source_id,
            video_title: job.video_title,
            cached,
            highlights: job.highlights,
            error: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// Clip payload returned by clip creation and polling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipResponse {
    pub status: ClipStatus,

    pub clip_id: String,

    pub video_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_id: Option<String>,

    pub start_time: u32,

    pub end_time: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl From<Clip> for ClipResponse {
    fn from(clip: Clip) -> Self {
        Self {
            status: clip.status,
            clip_id: clip.id.0,
            video_id: clip.source_id,
            highlight_id: clip.highlight_id,
            start_time: clip.start_time,
            end_time: clip.end_time,
            download_url: clip.download_url,
            error: clip.error_message,
            created_at: clip.created_at,
        }
    }
}

/// Acknowledgement returned to the workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CallbackAck {
    pub received: bool,
    pub status: String,
}
