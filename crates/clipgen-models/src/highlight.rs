//! Highlight models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format_clock;

/// An interesting time range within an analyzed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Highlight {
    /// Unique highlight ID
    pub id: String,

    /// Source video the highlight belongs to
    pub source_id: String,

    /// Start, in whole seconds from the start of the video
    pub start_timestamp: u32,

    /// End (exclusive), in whole seconds
    pub end_timestamp: u32,

    /// Start as a clock label, e.g. `2:05`
    pub time: String,

    /// Why this moment is worth clipping
    pub reason: String,
}

impl Highlight {
    /// Create a new highlight.
    pub fn new(
        source_id: impl Into<String>,
        start_timestamp: u32,
        end_timestamp: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.into(),
            start_timestamp,
            end_timestamp,
            time: format_clock(start_timestamp),
            reason: reason.into(),
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> u32 {
        self.end_timestamp.saturating_sub(self.start_timestamp)
    }
}

/// Highlight as reported by an analysis provider, before it is owned by a job.
///
/// Providers report seconds as JSON numbers, which may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HighlightDraft {
    pub start_timestamp: f64,
    pub end_timestamp: f64,
    #[serde(default)]
    pub reason: String,
}

impl HighlightDraft {
    pub fn new(start_timestamp: f64, end_timestamp: f64, reason: impl Into<String>) -> Self {
        Self {
            start_timestamp,
            end_timestamp,
            reason: reason.into(),
        }
    }

    /// Convert into a highlight for `source_id`.
    ///
    /// Returns `None` when the range is empty, inverted, or negative.
    pub fn into_highlight(self, source_id: &str) -> Option<Highlight> {
        if !self.start_timestamp.is_finite() || !self.end_timestamp.is_finite() {
            return None;
        }
        if self.start_timestamp < 0.0 {
            return None;
        }

        let start = self.start_timestamp.round() as u32;
        let end = self.end_timestamp.round() as u32;
        if start >= end {
            return None;
        }

        let reason = match self.reason.trim() {
            "" => "Interesting moment".to_string(),
            r => r.to_string(),
        };

        Some(Highlight::new(source_id, start, end, reason))
    }
}

/// Build the owned, ordered highlight list for a completed job.
///
/// Invalid drafts are dropped; the rest are sorted by start time.
pub fn build_highlights(source_id: &str, drafts: Vec<HighlightDraft>) -> Vec<Highlight> {
    let mut highlights: Vec<Highlight> = drafts
        .into_iter()
        .filter_map(|d| d.into_highlight(source_id))
        .collect();
    highlights.sort_by_key(|h| h.start_timestamp);
    highlights
}
