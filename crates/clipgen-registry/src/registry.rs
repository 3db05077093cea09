//! The store interface shared by the in-memory and persistent registries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipgen_models::{Clip, ClipId, ClipResolution, Highlight, Job, JobId, JobResolution};

use crate::error::RegistryResult;

/// Outcome of the analysis cache check.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// A completed job already exists for the source
    Hit(Job),
    /// No completed job; the candidate was stored
    Created(Job),
}

/// Job and clip storage.
///
/// Resolution methods are compare-and-set: they only succeed while the record
/// is still processing and otherwise fail with
/// [`RegistryError::AlreadyResolved`](crate::RegistryError::AlreadyResolved).
#[async_trait]
pub trait Registry: Send + Sync {
    /// Short name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn insert_job(&self, job: Job) -> RegistryResult<()>;

    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>>;

    /// Newest complete job for a source.
    async fn latest_complete_job(&self, source_id: &str) -> RegistryResult<Option<Job>>;

    async fn resolve_job(&self, id: &JobId, resolution: JobResolution) -> RegistryResult<Job>;

    async fn find_highlight(&self, highlight_id: &str) -> RegistryResult<Option<Highlight>>;

    async fn insert_clip(&self, clip: Clip) -> RegistryResult<()>;

    async fn get_clip(&self, id: &ClipId) -> RegistryResult<Option<Clip>>;

    async fn resolve_clip(&self, id: &ClipId, resolution: ClipResolution) -> RegistryResult<Clip>;

    /// Jobs still processing that were created before `cutoff`.
    async fn stale_jobs(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<JobId>>;

    /// Clips still processing that were created before `cutoff`.
    async fn stale_clips(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<ClipId>>;

    /// Return the cached result for the candidate's source, or store the
    /// candidate.
    ///
    /// The default is check-then-insert and may store duplicates under
    /// concurrent requests for the same source.
    async fn claim_analysis(&self, candidate: Job) -> RegistryResult<CacheLookup> {
        if let Some(cached) = self.latest_complete_job(&candidate.source_id).await? {
            return Ok(CacheLookup::Hit(cached));
        }
        self.insert_job(candidate.clone()).await?;
        Ok(CacheLookup::Created(candidate))
    }
}
