//! Process-local registry.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clipgen_models::{
    Clip, ClipId, ClipResolution, ClipStatus, Highlight, Job, JobId, JobResolution, JobStatus,
};
use tokio::sync::RwLock;

use crate::error::{RegistryError, RegistryResult};
use crate::registry::{CacheLookup, Registry};

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    clips: HashMap<ClipId, Clip>,
    /// highlight id -> owning job
    highlights: HashMap<String, JobId>,
}

impl Tables {
    fn latest_complete(&self, source_id: &str) -> Option<&Job> {
        self.jobs
            .values()
            .filter(|j| j.source_id == source_id && j.status == JobStatus::Complete)
            .max_by_key(|j| j.created_at)
    }
}

/// Registry held in process memory. Records live until the process exits.
///
/// The cache check and job creation in [`Registry::claim_analysis`] run under
/// a single write lock, so concurrent requests for one source share one job
/// once it completes.
#[derive(Default)]
pub struct InMemoryRegistry {
    tables: RwLock<Tables>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn job_count(&self) -> usize {
        self.tables.read().await.jobs.len()
    }

    pub async fn clip_count(&self) -> usize {
        self.tables.read().await.clips.len()
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_job(&self, job: Job) -> RegistryResult<()> {
        self.tables.write().await.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>> {
        Ok(self.tables.read().await.jobs.get(id).cloned())
    }

    async fn latest_complete_job(&self, source_id: &str) -> RegistryResult<Option<Job>> {
        Ok(self.tables.read().await.latest_complete(source_id).cloned())
    }

    async fn resolve_job(&self, id: &JobId, resolution: JobResolution) -> RegistryResult<Job> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(id)
            .ok_or_else(|| RegistryError::not_found(format!("job {}", id)))?;

        job.apply(resolution)?;
        let job = job.clone();

        for highlight in job.highlights.iter().flatten() {
            tables.highlights.insert(highlight.id.clone(), job.id.clone());
        }
        Ok(job)
    }

    async fn find_highlight(&self, highlight_id: &str) -> RegistryResult<Option<Highlight>> {
        let tables = self.tables.read().await;
        let highlight = tables
            .highlights
            .get(highlight_id)
            .and_then(|job_id| tables.jobs.get(job_id))
            .and_then(|job| job.highlights.as_ref())
            .and_then(|hs| hs.iter().find(|h| h.id == highlight_id))
            .cloned();
        Ok(highlight)
    }

    async fn insert_clip(&self, clip: Clip) -> RegistryResult<()> {
        self.tables.write().await.clips.insert(clip.id.clone(), clip);
        Ok(())
    }

    async fn get_clip(&self, id: &ClipId) -> RegistryResult<Option<Clip>> {
        Ok(self.tables.read().await.clips.get(id).cloned())
    }

    async fn resolve_clip(&self, id: &ClipId, resolution: ClipResolution) -> RegistryResult<Clip> {
        let mut tables = self.tables.write().await;
        let clip = tables
            .clips
            .get_mut(id)
            .ok_or_else(|| RegistryError::not_found(format!("clip {}", id)))?;

        clip.apply(resolution)?;
        Ok(clip.clone())
    }

    async fn stale_jobs(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<JobId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Processing && j.created_at < cutoff)
            .map(|j| j.id.clone())
            .collect())
    }

    async fn stale_clips(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<ClipId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .clips
            .values()
            .filter(|c| c.status == ClipStatus::Processing && c.created_at < cutoff)
            .map(|c| c.id.clone())
            .collect())
    }

    async fn claim_analysis(&self, candidate: Job) -> RegistryResult<CacheLookup> {
        let mut tables = self.tables.write().await;
        if let Some(cached) = tables.latest_complete(&candidate.source_id) {
            return Ok(CacheLookup::Hit(cached.clone()));
        }
        tables.jobs.insert(candidate.id.clone(), candidate.clone());
        Ok(CacheLookup::Created(candidate))
    }
}
