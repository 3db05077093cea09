//! The control surface: analysis and clip requests, polling, callbacks.
//!
//! Requests are validated and recorded synchronously; the work itself runs in
//! supervised background tasks (see [`crate::executor`]) and finishes either
//! directly or through a callback from the workflow engine.

use std::path::PathBuf;
use std::sync::Arc;

use clipgen_models::{
    build_highlights, extract_youtube_id, resolve_time_range, validate_source_id,
    AnalysisCallback, Clip, ClipCallback, ClipId, ClipRequest, ClipResolution, ClipStatus, Job,
    JobId, JobResolution,
};
use clipgen_registry::{CacheLookup, Registry};
use clipgen_storage::LocalArtifactStore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::executor::{finish_clip, finish_job, spawn_supervised, TrackedRecord};
use crate::metrics::{
    record_cache_hit, record_callback_rejected, record_clip_created, record_job_created,
};
use crate::provider::{AnalysisProvider, FixtureProvider, ProviderOutcome};
use crate::render::{ClipRenderer, RenderOutcome};
use crate::sources::{AnalysisInput, InputGatherer};

const NO_RESULTS_MESSAGE: &str =
    "No analysis found for this video. Use /api/analyze to analyze it first.";

/// Result of an analyze request.
#[derive(Debug, Clone)]
pub enum AnalyzeOutcome {
    /// A completed analysis for the source already existed
    Cached(Job),
    /// A new job was created and dispatched
    Started(Job),
}

impl AnalyzeOutcome {
    pub fn job(&self) -> &Job {
        match self {
            AnalyzeOutcome::Cached(job) | AnalyzeOutcome::Started(job) => job,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, AnalyzeOutcome::Cached(_))
    }
}

/// Where a finished clip can be fetched from.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipArtifact {
    /// Served from local disk
    Local(PathBuf),
    /// Held by a remote store; clients are redirected
    Remote(String),
}

/// Coordinates the registry, analysis providers and clip renderers.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<dyn Registry>,
    providers: Vec<Arc<dyn AnalysisProvider>>,
    renderers: Vec<Arc<dyn ClipRenderer>>,
    gatherer: InputGatherer,
    local_store: Option<LocalArtifactStore>,
}

impl Orchestrator {
    /// `providers` and `renderers` are tried in order; the first available
    /// one handles the request. An empty provider list falls back to
    /// [`FixtureProvider`].
    pub fn new(
        registry: Arc<dyn Registry>,
        providers: Vec<Arc<dyn AnalysisProvider>>,
        renderers: Vec<Arc<dyn ClipRenderer>>,
        gatherer: InputGatherer,
    ) -> Self {
        let providers = if providers.is_empty() {
            vec![Arc::new(FixtureProvider) as Arc<dyn AnalysisProvider>]
        } else {
            providers
        };

        Self {
            registry,
            providers,
            renderers,
            gatherer,
            local_store: None,
        }
    }

    /// Local store whose files are served by [`Orchestrator::clip_artifact`].
    pub fn with_local_store(mut self, store: LocalArtifactStore) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Convenience constructor wiring the yt-dlp input gatherer.
    pub fn with_config(
        registry: Arc<dyn Registry>,
        providers: Vec<Arc<dyn AnalysisProvider>>,
        renderers: Vec<Arc<dyn ClipRenderer>>,
        config: &WorkerConfig,
    ) -> Self {
        Self::new(registry, providers, renderers, InputGatherer::from_config(config))
    }

    pub fn registry(&self) -> &Arc<dyn Registry> {
        &self.registry
    }

    /// Names of the configured providers, in order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Names of the configured renderers, in order.
    pub fn renderer_names(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Start (or reuse) an analysis of a YouTube URL.
    #[instrument(skip(self))]
    pub async fn analyze(&self, youtube_url: &str) -> WorkerResult<AnalyzeOutcome> {
        self.analyze_tracked(youtube_url)
            .await
            .map(|(outcome, _)| outcome)
    }

    /// Like [`Orchestrator::analyze`], also returning the supervisor handle of
    /// the dispatched task.
    pub async fn analyze_tracked(
        &self,
        youtube_url: &str,
    ) -> WorkerResult<(AnalyzeOutcome, Option<JoinHandle<()>>)> {
        let source_id = extract_youtube_id(youtube_url)?;

        match self.registry.claim_analysis(Job::new(&source_id)).await? {
            CacheLookup::Hit(job) => {
                record_cache_hit();
                info!(job_id = %job.id, source_id = %source_id, "Returning cached analysis");
                Ok((AnalyzeOutcome::Cached(job), None))
            }
            CacheLookup::Created(job) => {
                record_job_created();
                info!(job_id = %job.id, source_id = %source_id, "Analysis job created");

                let handle = spawn_supervised(
                    self.registry.clone(),
                    TrackedRecord::Job(job.id.clone()),
                    self.clone().run_analysis(job.clone()),
                );
                Ok((AnalyzeOutcome::Started(job), Some(handle)))
            }
        }
    }

    async fn run_analysis(self, job: Job) -> WorkerResult<()> {
        let provider = self.select_provider().await;
        info!(job_id = %job.id, provider = provider.name(), "Running analysis");

        let input = if provider.needs_transcript() {
            self.gatherer.gather(&job.source_url).await?
        } else {
            AnalysisInput::default()
        };

        match provider.analyze(&job, &input).await? {
            ProviderOutcome::Highlights(drafts) => {
                let highlights = build_highlights(&job.source_id, drafts);
                if highlights.is_empty() {
                    warn!(job_id = %job.id, "Provider returned no usable highlights");
                }
                finish_job(
                    self.registry.as_ref(),
                    &job.id,
                    JobResolution::Complete {
                        highlights,
                        video_title: input.title,
                    },
                )
                .await?;
            }
            ProviderOutcome::Dispatched => {
                debug!(job_id = %job.id, "Waiting for analysis callback");
            }
        }
        Ok(())
    }

    async fn select_provider(&self) -> Arc<dyn AnalysisProvider> {
        for provider in &self.providers {
            if provider.is_available().await {
                return provider.clone();
            }
            debug!(provider = provider.name(), "Analysis provider unavailable");
        }
        warn!("No analysis provider available, using fixture highlights");
        Arc::new(FixtureProvider)
    }

    #[instrument(skip(self, job_id), fields(job_id = %job_id))]
    pub async fn job_status(&self, job_id: &JobId) -> WorkerResult<Job> {
        self.registry
            .get_job(job_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("Job not found"))
    }

    /// Newest completed analysis for a video id.
    #[instrument(skip(self))]
    pub async fn results_by_source(&self, video_id: &str) -> WorkerResult<Job> {
        validate_source_id(video_id)?;
        self.registry
            .latest_complete_job(video_id)
            .await?
            .ok_or_else(|| WorkerError::not_found(NO_RESULTS_MESSAGE))
    }

    // ========================================================================
    // Clips
    // ========================================================================

    #[instrument(skip(self))]
    pub async fn request_clip(&self, request: ClipRequest) -> WorkerResult<Clip> {
        self.request_clip_tracked(request).await.map(|(clip, _)| clip)
    }

    /// Like [`Orchestrator::request_clip`], also returning the supervisor
    /// handle of the dispatched task.
    pub async fn request_clip_tracked(
        &self,
        request: ClipRequest,
    ) -> WorkerResult<(Clip, JoinHandle<()>)> {
        let highlight = match request.highlight_id.as_deref() {
            Some(id) => {
                let found = self.registry.find_highlight(id).await?;
                if found.is_none() {
                    debug!(highlight_id = %id, "Referenced highlight not found");
                }
                found
            }
            None => None,
        };

        let (start, end) =
            resolve_time_range(request.start_time, request.end_time, highlight.as_ref())?;

        let source_id = match request.video_id.filter(|v| !v.is_empty()) {
            Some(id) => {
                validate_source_id(&id)?;
                id
            }
            None => match &highlight {
                Some(h) => h.source_id.clone(),
                None => return Err(WorkerError::MissingSource),
            },
        };

        let clip = Clip::new(source_id, start, end, highlight.map(|h| h.id));
        self.registry.insert_clip(clip.clone()).await?;
        record_clip_created();
        info!(
            clip_id = %clip.id,
            source_id = %clip.source_id,
            start = clip.start_time,
            end = clip.end_time,
            "Clip created"
        );

        let handle = spawn_supervised(
            self.registry.clone(),
            TrackedRecord::Clip(clip.id.clone()),
            self.clone().run_clip(clip.clone()),
        );
        Ok((clip, handle))
    }

    async fn run_clip(self, clip: Clip) -> WorkerResult<()> {
        let renderer = self.select_renderer().await?;
        info!(clip_id = %clip.id, renderer = renderer.name(), "Rendering clip");

        match renderer.render(&clip).await? {
            RenderOutcome::Ready(url) => {
                finish_clip(self.registry.as_ref(), &clip.id, ClipResolution::ready(url)).await?;
            }
            RenderOutcome::Dispatched => {
                debug!(clip_id = %clip.id, "Waiting for clip callback");
            }
        }
        Ok(())
    }

    async fn select_renderer(&self) -> WorkerResult<Arc<dyn ClipRenderer>> {
        for renderer in &self.renderers {
            if renderer.is_available().await {
                return Ok(renderer.clone());
            }
            debug!(renderer = renderer.name(), "Clip renderer unavailable");
        }
        Err(WorkerError::config_error("No clip renderer available"))
    }

    #[instrument(skip(self, clip_id), fields(clip_id = %clip_id))]
    pub async fn clip_status(&self, clip_id: &ClipId) -> WorkerResult<Clip> {
        self.registry
            .get_clip(clip_id)
            .await?
            .ok_or_else(|| WorkerError::not_found("Clip not found"))
    }

    /// Locate a ready clip's file.
    ///
    /// Local files win; otherwise an absolute `download_url` is returned for
    /// redirecting. Anything else is `NotFound`.
    #[instrument(skip(self, clip_id), fields(clip_id = %clip_id))]
    pub async fn clip_artifact(&self, clip_id: &ClipId) -> WorkerResult<ClipArtifact> {
        let clip = self.clip_status(clip_id).await?;
        if clip.status != ClipStatus::Ready {
            return Err(WorkerError::not_found("Clip file not ready"));
        }

        if let Some(store) = &self.local_store {
            match store.find(clip.id.as_str()).await {
                Ok(path) => return Ok(ClipArtifact::Local(path)),
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!("Local clip lookup failed: {}", e),
            }
        }

        match clip.download_url {
            Some(url) if is_remote_locator(&url, clip.id.as_str()) => Ok(ClipArtifact::Remote(url)),
            _ => Err(WorkerError::not_found("Clip file not found")),
        }
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    #[instrument(skip(self, callback), fields(job_id = %callback.job_id))]
    pub async fn handle_analysis_callback(&self, callback: AnalysisCallback) -> WorkerResult<Job> {
        let Some(job) = self.registry.get_job(&callback.job_id).await? else {
            warn!("Analysis callback for unknown job, dropping");
            record_callback_rejected("analysis", "unknown");
            return Err(WorkerError::not_found("Job not found"));
        };

        let resolution = callback.into_resolution(&job.source_id);
        finish_job(self.registry.as_ref(), &job.id, resolution)
            .await
            .inspect_err(|e| {
                if matches!(e, WorkerError::AlreadyResolved(_)) {
                    record_callback_rejected("analysis", "already_resolved");
                }
            })
    }

    #[instrument(skip(self, callback), fields(clip_id = %callback.clip_id))]
    pub async fn handle_clip_callback(&self, callback: ClipCallback) -> WorkerResult<Clip> {
        let clip_id = callback.clip_id.clone();
        if self.registry.get_clip(&clip_id).await?.is_none() {
            warn!("Clip callback for unknown clip, dropping");
            record_callback_rejected("clip", "unknown");
            return Err(WorkerError::not_found("Clip not found"));
        }

        finish_clip(self.registry.as_ref(), &clip_id, callback.into_resolution())
            .await
            .inspect_err(|e| {
                if matches!(e, WorkerError::AlreadyResolved(_)) {
                    record_callback_rejected("clip", "already_resolved");
                }
            })
    }
}

/// Absolute URL that does not point back at the local file route.
fn is_remote_locator(url: &str, clip_id: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://"))
        && !url.ends_with(&format!("/api/clips/{}/file", clip_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{CaptionSource, MetadataSource};
    use async_trait::async_trait;
    use clipgen_media::{MediaResult, SourceMetadata};
    use clipgen_models::{HighlightDraft, JobStatus};
    use clipgen_registry::InMemoryRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StaticCaptions;

    #[async_trait]
    impl CaptionSource for StaticCaptions {
        async fn fetch(&self, _source_url: &str) -> MediaResult<String> {
            Ok("WEBVTT\n\n00:00:05.000 --> 00:00:08.000\nhello\n".to_string())
        }
    }

    struct NoCaptions;

    #[async_trait]
    impl CaptionSource for NoCaptions {
        async fn fetch(&self, _source_url: &str) -> MediaResult<String> {
            Err(clipgen_media::MediaError::CaptionsUnavailable("none".into()))
        }
    }

    struct StaticMetadata;

    #[async_trait]
    impl MetadataSource for StaticMetadata {
        async fn probe(&self, _source_url: &str) -> MediaResult<SourceMetadata> {
            Ok(SourceMetadata {
                duration_secs: 212.0,
                title: Some("Never Gonna Give You Up".to_string()),
            })
        }
    }

    fn gatherer(captions: Arc<dyn CaptionSource>) -> InputGatherer {
        InputGatherer::new(captions, Arc::new(StaticMetadata), 6000)
    }

    /// Writes a fake clip into the local store.
    struct FileRenderer {
        store: LocalArtifactStore,
    }

    #[async_trait]
    impl ClipRenderer for FileRenderer {
        fn name(&self) -> &'static str {
            "file"
        }

        async fn render(&self, clip: &Clip) -> WorkerResult<RenderOutcome> {
            let path = self.store.path_for(clip.id.as_str())?;
            tokio::fs::create_dir_all(self.store.root()).await?;
            tokio::fs::write(&path, b"clip").await?;
            Ok(RenderOutcome::Ready(self.store.download_url(clip.id.as_str())))
        }
    }

    struct DispatchingRenderer;

    #[async_trait]
    impl ClipRenderer for DispatchingRenderer {
        fn name(&self) -> &'static str {
            "dispatch"
        }

        async fn render(&self, _clip: &Clip) -> WorkerResult<RenderOutcome> {
            Ok(RenderOutcome::Dispatched)
        }
    }

    struct DispatchingProvider;

    #[async_trait]
    impl AnalysisProvider for DispatchingProvider {
        fn name(&self) -> &'static str {
            "dispatch"
        }

        async fn analyze(&self, _job: &Job, _input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
            Ok(ProviderOutcome::Dispatched)
        }
    }

    struct OfflineProvider(AtomicUsize);

    #[async_trait]
    impl AnalysisProvider for OfflineProvider {
        fn name(&self) -> &'static str {
            "offline"
        }

        async fn is_available(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            false
        }

        async fn analyze(&self, _job: &Job, _input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
            unreachable!("offline provider is never selected")
        }
    }

    struct TitledProvider;

    #[async_trait]
    impl AnalysisProvider for TitledProvider {
        fn name(&self) -> &'static str {
            "titled"
        }

        async fn analyze(&self, _job: &Job, input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
            assert!(input.transcript.contains("hello"));
            Ok(ProviderOutcome::Highlights(vec![
                HighlightDraft::new(5.0, 35.0, "Opening"),
                HighlightDraft::new(50.0, 40.0, "Inverted"),
            ]))
        }
    }

    struct Harness {
        orchestrator: Orchestrator,
        registry: Arc<InMemoryRegistry>,
        _dir: TempDir,
    }

    fn harness(
        providers: Vec<Arc<dyn AnalysisProvider>>,
        renderer: Option<Arc<dyn ClipRenderer>>,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = LocalArtifactStore::new(dir.path().join("clips"), "");
        let registry = Arc::new(InMemoryRegistry::new());
        let renderer = renderer.unwrap_or_else(|| {
            Arc::new(FileRenderer {
                store: store.clone(),
            }) as Arc<dyn ClipRenderer>
        });

        let orchestrator = Orchestrator::new(
            registry.clone(),
            providers,
            vec![renderer],
            gatherer(Arc::new(StaticCaptions)),
        )
        .with_local_store(store);

        Harness {
            orchestrator,
            registry,
            _dir: dir,
        }
    }

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_analyze_with_fixture_completes() {
        let h = harness(vec![], None);

        let (outcome, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        assert!(!outcome.is_cached());
        assert_eq!(outcome.job().status, JobStatus::Processing);
        assert_eq!(outcome.job().source_id, "dQw4w9WgXcQ");
        handle.unwrap().await.unwrap();

        let job = h.orchestrator.job_status(&outcome.job().id).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        let highlights = job.highlights.unwrap();
        assert_eq!(highlights[0].start_timestamp, 30);
        assert_eq!(highlights[0].end_timestamp, 55);
        assert!(highlights.iter().all(|h| h.start_timestamp < h.end_timestamp));
    }

    #[tokio::test]
    async fn test_second_analyze_is_cached() {
        let h = harness(vec![], None);

        let (first, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();

        let second = h
            .orchestrator
            .analyze("https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert!(second.is_cached());
        assert_eq!(second.job().id, first.job().id);
        assert_eq!(h.registry.job_count().await, 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_invalid_url() {
        let h = harness(vec![], None);
        let err = h.orchestrator.analyze("https://example.com/video").await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidSource(_)));
        assert_eq!(h.registry.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_provider_gets_transcript_and_title() {
        let h = harness(vec![Arc::new(TitledProvider)], None);

        let (outcome, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();

        let job = h.orchestrator.job_status(&outcome.job().id).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
        assert_eq!(job.video_title, "Never Gonna Give You Up");
        // The inverted draft is dropped
        assert_eq!(job.highlights.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped() {
        let offline = Arc::new(OfflineProvider(AtomicUsize::new(0)));
        let providers: Vec<Arc<dyn AnalysisProvider>> =
            vec![offline.clone(), Arc::new(FixtureProvider)];
        let h = harness(providers, None);

        let (outcome, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();

        assert_eq!(offline.0.load(Ordering::SeqCst), 1);
        let job = h.orchestrator.job_status(&outcome.job().id).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn test_missing_captions_resolve_job_to_error() {
        let registry = Arc::new(InMemoryRegistry::new());
        let orchestrator = Orchestrator::new(
            registry.clone(),
            vec![Arc::new(TitledProvider)],
            vec![],
            gatherer(Arc::new(NoCaptions)),
        );

        let (outcome, handle) = orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();

        let job = orchestrator.job_status(&outcome.job().id).await.unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(
            job.error_message.as_deref(),
            Some("No transcript found for this video. It might not have captions.")
        );
    }

    #[tokio::test]
    async fn test_dispatched_analysis_resolves_by_callback() {
        let h = harness(vec![Arc::new(DispatchingProvider)], None);

        let (outcome, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();
        let job_id = outcome.job().id.clone();
        assert_eq!(
            h.orchestrator.job_status(&job_id).await.unwrap().status,
            JobStatus::Processing
        );

        let callback: AnalysisCallback = serde_json::from_value(serde_json::json!({
            "job_id": job_id.as_str(),
            "highlights": [{"start_timestamp": 10, "end_timestamp": 40, "reason": "Hook"}]
        }))
        .unwrap();
        let job = h.orchestrator.handle_analysis_callback(callback.clone()).await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);

        // A second resolution is rejected and changes nothing
        let err = h.orchestrator.handle_analysis_callback(callback).await.unwrap_err();
        assert!(matches!(err, WorkerError::AlreadyResolved(_)));
        let job = h.orchestrator.job_status(&job_id).await.unwrap();
        assert_eq!(job.highlights.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_callback_is_not_found() {
        let h = harness(vec![], None);

        let callback: AnalysisCallback =
            serde_json::from_value(serde_json::json!({"job_id": "missing", "error": "x"})).unwrap();
        let err = h.orchestrator.handle_analysis_callback(callback).await.unwrap_err();
        assert!(matches!(err, WorkerError::NotFound(_)));

        let callback: ClipCallback =
            serde_json::from_value(serde_json::json!({"clip_id": "missing", "error": "x"})).unwrap();
        let err = h.orchestrator.handle_clip_callback(callback).await.unwrap_err();
        assert!(matches!(err, WorkerError::NotFound(_)));

        assert_eq!(h.registry.job_count().await, 0);
        assert_eq!(h.registry.clip_count().await, 0);
    }

    #[tokio::test]
    async fn test_explicit_clip_becomes_ready() {
        let h = harness(vec![], None);

        let (clip, handle) = h
            .orchestrator
            .request_clip_tracked(ClipRequest {
                video_id: Some("dQw4w9WgXcQ".to_string()),
                start_time: Some(30),
                end_time: Some(60),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(clip.status, ClipStatus::Processing);
        handle.await.unwrap();

        let clip = h.orchestrator.clip_status(&clip.id).await.unwrap();
        assert_eq!(clip.status, ClipStatus::Ready);
        assert!(!clip.download_url.clone().unwrap_or_default().is_empty());

        let artifact = h.orchestrator.clip_artifact(&clip.id).await.unwrap();
        assert!(matches!(artifact, ClipArtifact::Local(path) if path.exists()));
    }

    #[tokio::test]
    async fn test_clip_without_range_is_rejected() {
        let h = harness(vec![], None);

        let err = h
            .orchestrator
            .request_clip(ClipRequest {
                video_id: Some("dQw4w9WgXcQ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::MissingTimeRange));
        assert_eq!(h.registry.clip_count().await, 0);
    }

    #[tokio::test]
    async fn test_clip_without_source_is_rejected() {
        let h = harness(vec![], None);

        let err = h
            .orchestrator
            .request_clip(ClipRequest {
                start_time: Some(10),
                end_time: Some(40),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::MissingSource));
        assert!(err.is_validation());
        assert_eq!(h.registry.clip_count().await, 0);
    }

    #[tokio::test]
    async fn test_inverted_clip_range_is_rejected() {
        let h = harness(vec![], None);

        let err = h
            .orchestrator
            .request_clip(ClipRequest {
                video_id: Some("dQw4w9WgXcQ".to_string()),
                start_time: Some(60),
                end_time: Some(30),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::InvalidTimeRange { start: 60, end: 30 }));
        assert_eq!(h.registry.clip_count().await, 0);
    }

    #[tokio::test]
    async fn test_clip_from_highlight_inherits_source_and_bounds() {
        let h = harness(vec![], None);

        let (outcome, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();
        let job = h.orchestrator.job_status(&outcome.job().id).await.unwrap();
        let highlight = job.highlights.unwrap()[0].clone();

        let clip = h
            .orchestrator
            .request_clip(ClipRequest {
                highlight_id: Some(highlight.id.clone()),
                end_time: Some(50),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(clip.source_id, "dQw4w9WgXcQ");
        assert_eq!(clip.start_time, 30);
        assert_eq!(clip.end_time, 50);
        assert_eq!(clip.highlight_id.as_deref(), Some(highlight.id.as_str()));
    }

    #[tokio::test]
    async fn test_dispatched_clip_and_remote_artifact() {
        let renderer: Arc<dyn ClipRenderer> = Arc::new(DispatchingRenderer);
        let h = harness(vec![], Some(renderer));

        let (clip, handle) = h
            .orchestrator
            .request_clip_tracked(ClipRequest {
                video_id: Some("dQw4w9WgXcQ".to_string()),
                start_time: Some(30),
                end_time: Some(60),
                ..Default::default()
            })
            .await
            .unwrap();
        handle.await.unwrap();

        let err = h.orchestrator.clip_artifact(&clip.id).await.unwrap_err();
        assert!(matches!(err, WorkerError::NotFound(_)));

        let callback: ClipCallback = serde_json::from_value(serde_json::json!({
            "clip_id": clip.id.as_str(),
            "download_url": "https://cdn.example.com/clips/c1.mp4"
        }))
        .unwrap();
        h.orchestrator.handle_clip_callback(callback).await.unwrap();

        let artifact = h.orchestrator.clip_artifact(&clip.id).await.unwrap();
        assert_eq!(
            artifact,
            ClipArtifact::Remote("https://cdn.example.com/clips/c1.mp4".to_string())
        );
    }

    #[tokio::test]
    async fn test_results_by_source() {
        let h = harness(vec![], None);

        let err = h.orchestrator.results_by_source("dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(err.to_string(), NO_RESULTS_MESSAGE);

        let (_, handle) = h.orchestrator.analyze_tracked(URL).await.unwrap();
        handle.unwrap().await.unwrap();

        let job = h.orchestrator.results_by_source("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(job.status, JobStatus::Complete);
    }

    #[test]
    fn test_remote_locator() {
        assert!(is_remote_locator("https://cdn.example.com/a.mp4", "a"));
        assert!(!is_remote_locator("http://localhost:8000/api/clips/a/file", "a"));
        assert!(!is_remote_locator("/api/clips/a/file", "a"));
    }
}
