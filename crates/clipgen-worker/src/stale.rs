//! Background sweep for records whose completion never arrived.
//!
//! Work handed to the workflow engine finishes only when its callback comes
//! back. If the engine drops it, the record would stay `processing` forever;
//! the sweeper fails such records once they pass a deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clipgen_models::{ClipResolution, JobResolution};
use clipgen_registry::Registry;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{finish_clip, finish_job};
use crate::metrics::record_stale_resolved;

pub const STALE_JOB_MESSAGE: &str =
    "Analysis timed out waiting for the workflow engine. Please try again.";
pub const STALE_CLIP_MESSAGE: &str =
    "Clip generation timed out waiting for the workflow engine. Please try again.";

/// Records failed by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs: usize,
    pub clips: usize,
}

pub struct StaleRecordSweeper {
    registry: Arc<dyn Registry>,
    max_age: Duration,
    every: Duration,
    enabled: bool,
}

impl StaleRecordSweeper {
    pub fn new(registry: Arc<dyn Registry>, max_age: Duration, every: Duration) -> Self {
        Self {
            registry,
            max_age,
            every,
            enabled: true,
        }
    }

    pub fn from_config(registry: Arc<dyn Registry>, config: &WorkerConfig) -> Self {
        Self {
            enabled: config.stale_sweep_enabled,
            ..Self::new(
                registry,
                Duration::from_secs(config.stale_after_secs),
                Duration::from_secs(config.stale_sweep_interval_secs),
            )
        }
    }

    /// Sweep forever. Spawn this as a background task.
    pub async fn run(self) {
        if !self.enabled {
            info!("Stale record sweep is disabled");
            return;
        }

        info!(
            max_age_secs = self.max_age.as_secs(),
            interval_secs = self.every.as_secs(),
            "Starting stale record sweep"
        );

        // interval() panics on a zero period
        let mut ticker = interval(self.every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep_once().await {
                error!("Stale record sweep failed: {}", e);
            }
        }
    }

    /// Fail every record still processing past the deadline.
    pub async fn sweep_once(&self) -> WorkerResult<SweepReport> {
        let age = chrono::Duration::from_std(self.max_age)
            .map_err(|e| WorkerError::config_error(format!("Invalid stale deadline: {}", e)))?;
        let cutoff = Utc::now() - age;
        let mut report = SweepReport::default();

        for id in self.registry.stale_jobs(cutoff).await? {
            warn!(job_id = %id, "Job passed its deadline without completing");
            match finish_job(
                self.registry.as_ref(),
                &id,
                JobResolution::failed(STALE_JOB_MESSAGE),
            )
            .await
            {
                Ok(_) => {
                    record_stale_resolved("job");
                    report.jobs += 1;
                }
                // A callback won the race
                Err(WorkerError::AlreadyResolved(_)) => {}
                Err(e) => error!(job_id = %id, "Failed to expire job: {}", e),
            }
        }

        for id in self.registry.stale_clips(cutoff).await? {
            warn!(clip_id = %id, "Clip passed its deadline without completing");
            match finish_clip(
                self.registry.as_ref(),
                &id,
                ClipResolution::failed(STALE_CLIP_MESSAGE),
            )
            .await
            {
                Ok(_) => {
                    record_stale_resolved("clip");
                    report.clips += 1;
                }
                Err(WorkerError::AlreadyResolved(_)) => {}
                Err(e) => error!(clip_id = %id, "Failed to expire clip: {}", e),
            }
        }

        if report != SweepReport::default() {
            info!(jobs = report.jobs, clips = report.clips, "Expired stale records");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipgen_models::{Clip, ClipStatus, Job, JobStatus};
    use clipgen_registry::InMemoryRegistry;

    const MAX_AGE: Duration = Duration::from_secs(600);

    fn aged_job(minutes: i64) -> Job {
        let mut job = Job::new("dQw4w9WgXcQ");
        job.created_at = Utc::now() - chrono::Duration::minutes(minutes);
        job
    }

    #[tokio::test]
    async fn test_sweep_fails_only_overdue_records() {
        let registry = Arc::new(InMemoryRegistry::new());
        let overdue = aged_job(30);
        let recent = aged_job(1);
        let mut clip = Clip::new("dQw4w9WgXcQ", 30, 60, None);
        clip.created_at = Utc::now() - chrono::Duration::minutes(30);
        let (overdue_id, recent_id, clip_id) =
            (overdue.id.clone(), recent.id.clone(), clip.id.clone());
        registry.insert_job(overdue).await.unwrap();
        registry.insert_job(recent).await.unwrap();
        registry.insert_clip(clip).await.unwrap();

        let sweeper = StaleRecordSweeper::new(registry.clone(), MAX_AGE, Duration::from_secs(1));
        let report = sweeper.sweep_once().await.unwrap();
        assert_eq!(report, SweepReport { jobs: 1, clips: 1 });

        let job = registry.get_job(&overdue_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error_message.as_deref(), Some(STALE_JOB_MESSAGE));

        let job = registry.get_job(&recent_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Processing);

        let clip = registry.get_clip(&clip_id).await.unwrap().unwrap();
        assert_eq!(clip.status, ClipStatus::Error);
        assert_eq!(clip.error_message.as_deref(), Some(STALE_CLIP_MESSAGE));
    }

    #[tokio::test]
    async fn test_late_callback_after_sweep_is_rejected() {
        let registry = Arc::new(InMemoryRegistry::new());
        let job = aged_job(30);
        let id = job.id.clone();
        registry.insert_job(job).await.unwrap();

        StaleRecordSweeper::new(registry.clone(), MAX_AGE, Duration::from_secs(1))
            .sweep_once()
            .await
            .unwrap();

        let err = finish_job(
            registry.as_ref(),
            &id,
            JobResolution::Complete {
                highlights: vec![],
                video_title: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn test_second_sweep_finds_nothing() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.insert_job(aged_job(30)).await.unwrap();
        let sweeper = StaleRecordSweeper::new(registry, MAX_AGE, Duration::from_secs(1));

        assert_eq!(sweeper.sweep_once().await.unwrap().jobs, 1);
        assert_eq!(sweeper.sweep_once().await.unwrap(), SweepReport::default());
    }
}
