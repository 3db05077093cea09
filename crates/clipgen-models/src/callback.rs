//! Completion payloads posted back by the remote workflow engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{build_highlights, ClipId, ClipResolution, HighlightDraft, JobId, JobResolution};

/// Analysis completion: either `highlights` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisCallback {
    pub job_id: JobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<HighlightDraft>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_title: Option<String>,
}

impl AnalysisCallback {
    /// Turn the payload into a resolution for a job on `source_id`.
    ///
    /// An `error` field always wins over highlights.
    pub fn into_resolution(self, source_id: &str) -> JobResolution {
        if let Some(error) = self.error.filter(|e| !e.trim().is_empty()) {
            return JobResolution::Failed { message: error };
        }

        match self.highlights {
            Some(drafts) => JobResolution::Complete {
                highlights: build_highlights(source_id, drafts),
                video_title: self.video_title,
            },
            None => JobResolution::failed("Workflow returned neither highlights nor an error"),
        }
    }
}

/// Clip completion: either `download_url` or `error`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClipCallback {
    pub clip_id: ClipId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClipCallback {
    pub fn into_resolution(self) -> ClipResolution {
        if let Some(error) = self.error.filter(|e| !e.trim().is_empty()) {
            return ClipResolution::Failed { message: error };
        }

        match self.download_url.filter(|u| !u.trim().is_empty()) {
            Some(url) => ClipResolution::Ready { download_url: url },
            None => ClipResolution::failed("Workflow returned neither a download URL nor an error"),
        }
    }
}
