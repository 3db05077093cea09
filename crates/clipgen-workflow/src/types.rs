//! Webhook payloads sent to the workflow engine.

use serde::{Deserialize, Serialize};

/// Body of the analysis webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisWebhook {
    pub job_id: String,
    pub video_id: String,
    pub video_url: String,
    pub video_title: String,
    /// Normalized transcript
    pub transcript: String,
    /// Whole seconds
    pub duration: u32,
    /// Where the engine posts its result
    pub callback_url: String,
}

/// Body of the clip webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipWebhook {
    pub clip_id: String,
    pub video_id: String,
    pub video_url: String,
    pub start_time: u32,
    pub end_time: u32,
    pub callback_url: String,
}

/// Liveness response. The engine may answer with an empty body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: Option<String>,
}
