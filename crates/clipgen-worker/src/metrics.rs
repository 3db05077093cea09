//! Job and clip lifecycle metrics.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_CREATED_TOTAL: &str = "clipgen_jobs_created_total";
    pub const JOBS_RESOLVED_TOTAL: &str = "clipgen_jobs_resolved_total";
    pub const ANALYSIS_CACHE_HITS_TOTAL: &str = "clipgen_analysis_cache_hits_total";
    pub const CLIPS_CREATED_TOTAL: &str = "clipgen_clips_created_total";
    pub const CLIPS_RESOLVED_TOTAL: &str = "clipgen_clips_resolved_total";
    /// Callbacks refused because the record was unknown or already terminal
    pub const CALLBACKS_REJECTED_TOTAL: &str = "clipgen_callbacks_rejected_total";
    /// Records failed by the sweep after their deadline passed
    pub const STALE_RESOLVED_TOTAL: &str = "clipgen_stale_resolved_total";
}

pub fn record_job_created() {
    counter!(names::JOBS_CREATED_TOTAL).increment(1);
}

pub fn record_job_resolved(status: &'static str) {
    counter!(names::JOBS_RESOLVED_TOTAL, "status" => status).increment(1);
}

pub fn record_cache_hit() {
    counter!(names::ANALYSIS_CACHE_HITS_TOTAL).increment(1);
}

pub fn record_clip_created() {
    counter!(names::CLIPS_CREATED_TOTAL).increment(1);
}

pub fn record_clip_resolved(status: &'static str) {
    counter!(names::CLIPS_RESOLVED_TOTAL, "status" => status).increment(1);
}

pub fn record_stale_resolved(kind: &'static str) {
    counter!(names::STALE_RESOLVED_TOTAL, "kind" => kind).increment(1);
}

pub fn record_callback_rejected(kind: &'static str, reason: &'static str) {
    counter!(
        names::CALLBACKS_REJECTED_TOTAL,
        "kind" => kind,
        "reason" => reason
    )
    .increment(1);
}
