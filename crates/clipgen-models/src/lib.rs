//! Shared data models for the ClipGen backend.
//!
//! This crate provides Serde-serializable types for:
//! - Analysis jobs and the highlights they produce
//! - Clip requests and their lifecycle
//! - Callback payloads sent back by the remote workflow engine
//! - Request and response bodies of the HTTP API
//! - Source URL parsing and timestamp helpers

pub mod api;
pub mod callback;
pub mod clip;
pub mod highlight;
pub mod job;
pub mod source;
pub mod timestamp;

// Re-export common types
pub use api::{AnalyzeRequest, CallbackAck, ClipRequest, ClipResponse, JobResponse};
pub use callback::{AnalysisCallback, ClipCallback};
pub use clip::{resolve_time_range, Clip, ClipId, ClipResolution, ClipStatus, TimeRangeError};
pub use highlight::{build_highlights, Highlight, HighlightDraft};
pub use job::{Job, JobId, JobResolution, JobStatus};
pub use source::{extract_youtube_id, validate_source_id, watch_url, SourceIdError, SourceIdResult};
pub use timestamp::{format_clock, parse_timestamp, TimestampError};

use thiserror::Error;

/// Rejected state transition on a job or clip record.
///
/// Records resolve exactly once; any later resolution attempt is refused
/// and leaves the stored record untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{kind} {id} is already {status}")]
    AlreadyResolved {
        kind: &'static str,
        id: String,
        status: &'static str,
    },
}
