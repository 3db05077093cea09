//! Supervised background tasks.
//!
//! Every analysis or clip dispatch runs as its own tokio task. A second task
//! awaits its `JoinHandle` and writes the outcome into the record when the
//! work fails, returns an error, or panics, so a record never stays in
//! `processing` because its task died.

use std::future::Future;
use std::sync::Arc;

use clipgen_models::{Clip, ClipId, ClipResolution, Job, JobId, JobResolution};
use clipgen_registry::{Registry, RegistryError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics::{record_clip_resolved, record_job_resolved};

/// Message written when a task panics or is cancelled.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing";

/// The record a background task is responsible for.
#[derive(Debug, Clone)]
pub enum TrackedRecord {
    Job(JobId),
    Clip(ClipId),
}

impl std::fmt::Display for TrackedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackedRecord::Job(id) => write!(f, "job {}", id),
            TrackedRecord::Clip(id) => write!(f, "clip {}", id),
        }
    }
}

/// Spawn `task` and a supervisor that resolves `record` to `error` if the
/// task returns an error or panics.
///
/// Returns the supervisor's handle; it completes once the outcome has been
/// recorded.
pub fn spawn_supervised<F>(
    registry: Arc<dyn Registry>,
    record: TrackedRecord,
    task: F,
) -> JoinHandle<()>
where
    F: Future<Output = WorkerResult<()>> + Send + 'static,
{
    let handle = tokio::spawn(task);

    tokio::spawn(async move {
        let message = match handle.await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                warn!(record = %record, "Background task failed: {}", e);
                e.user_message()
            }
            Err(join_err) if join_err.is_panic() => {
                error!(record = %record, "Background task panicked");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            Err(_) => {
                warn!(record = %record, "Background task was cancelled");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        let result = match &record {
            TrackedRecord::Job(id) => {
                finish_job(registry.as_ref(), id, JobResolution::failed(message))
                    .await
                    .map(|_| ())
            }
            TrackedRecord::Clip(id) => {
                finish_clip(registry.as_ref(), id, ClipResolution::failed(message))
                    .await
                    .map(|_| ())
            }
        };

        match result {
            Ok(()) => {}
            // Already terminal: the task resolved it before failing
            Err(WorkerError::AlreadyResolved(_)) => {}
            Err(e) => error!(record = %record, "Failed to record task failure: {}", e),
        }
    })
}

/// Resolve a job and record the transition.
pub async fn finish_job(
    registry: &dyn Registry,
    id: &JobId,
    resolution: JobResolution,
) -> WorkerResult<Job> {
    let status = resolution.target_status();
    let job = registry.resolve_job(id, resolution).await.map_err(log_rejection)?;

    record_job_resolved(status.as_str());
    info!(
        job_id = %id,
        status = %status,
        highlights = job.highlights.as_ref().map_or(0, Vec::len),
        "Job resolved"
    );
    Ok(job)
}

/// Resolve a clip and record the transition.
pub async fn finish_clip(
    registry: &dyn Registry,
    id: &ClipId,
    resolution: ClipResolution,
) -> WorkerResult<Clip> {
    let status = resolution.target_status();
    let clip = registry.resolve_clip(id, resolution).await.map_err(log_rejection)?;

    record_clip_resolved(status.as_str());
    info!(clip_id = %id, status = %status.as_str(), "Clip resolved");
    Ok(clip)
}

fn log_rejection(err: RegistryError) -> WorkerError {
    if let RegistryError::AlreadyResolved(t) = &err {
        warn!("Ignoring resolution: {}", t);
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipgen_models::{ClipStatus, JobStatus};
    use clipgen_registry::InMemoryRegistry;

    async fn registry_with_job() -> (Arc<dyn Registry>, JobId) {
        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let job = Job::new("dQw4w9WgXcQ");
        let id = job.id.clone();
        registry.insert_job(job).await.unwrap();
        (registry, id)
    }

    async fn panics() -> WorkerResult<()> {
        panic!("boom")
    }

    async fn no_captions() -> WorkerResult<()> {
        Err(WorkerError::NoCaptionsAvailable)
    }

    async fn succeeds() -> WorkerResult<()> {
        Ok(())
    }

    async fn resolve_then_panic(registry: Arc<dyn Registry>, id: ClipId) -> WorkerResult<()> {
        finish_clip(registry.as_ref(), &id, ClipResolution::ready("/x")).await?;
        panic!("after resolution")
    }

    #[tokio::test]
    async fn test_panic_resolves_job_to_error() {
        let (registry, id) = registry_with_job().await;

        spawn_supervised(registry.clone(), TrackedRecord::Job(id.clone()), panics())
            .await
            .unwrap();

        let job = registry.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some(INTERNAL_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_error_result_uses_user_message() {
        let (registry, id) = registry_with_job().await;

        spawn_supervised(registry.clone(), TrackedRecord::Job(id.clone()), no_captions())
            .await
            .unwrap();

        let job = registry.get_job(&id).await.unwrap().unwrap();
        assert_eq!(
            job.error_message.as_deref(),
            Some("No transcript found for this video. It might not have captions.")
        );
    }

    #[tokio::test]
    async fn test_success_leaves_record_alone() {
        let (registry, id) = registry_with_job().await;

        spawn_supervised(registry.clone(), TrackedRecord::Job(id.clone()), succeeds())
            .await
            .unwrap();

        let job = registry.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_failure_after_resolution_keeps_first_outcome() {
        let registry: Arc<dyn Registry> = Arc::new(InMemoryRegistry::new());
        let clip = Clip::new("dQw4w9WgXcQ", 30, 60, None);
        let id = clip.id.clone();
        registry.insert_clip(clip).await.unwrap();

        spawn_supervised(
            registry.clone(),
            TrackedRecord::Clip(id.clone()),
            resolve_then_panic(registry.clone(), id.clone()),
        )
        .await
        .unwrap();

        let clip = registry.get_clip(&id).await.unwrap().unwrap();
        assert_eq!(clip.status, ClipStatus::Ready);
        assert!(clip.error_message.is_none());
    }
}
