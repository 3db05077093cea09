//! Clip renderers: hand a clip to the workflow engine, or cut it locally and
//! publish the file.

use std::sync::Arc;

use async_trait::async_trait;
use clipgen_media::{ClipExtractor, ExtractRequest, FfmpegEncoder, ToolRunner, YtDlpDownloader};
use clipgen_models::Clip;
use clipgen_storage::ArtifactStore;
use clipgen_workflow::{ClipWebhook, WorkflowClient};
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;

/// What a renderer did with a clip.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Finished; carries the download locator
    Ready(String),
    /// Handed off; the clip is resolved later by callback
    Dispatched,
}

#[async_trait]
pub trait ClipRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn is_available(&self) -> bool {
        true
    }

    async fn render(&self, clip: &Clip) -> WorkerResult<RenderOutcome>;
}

/// Delegates clipping to the workflow engine.
pub struct RemoteClipRenderer {
    client: WorkflowClient,
    callback_url: String,
}

impl RemoteClipRenderer {
    pub fn new(client: WorkflowClient, callback_url: impl Into<String>) -> Self {
        Self {
            client,
            callback_url: callback_url.into(),
        }
    }
}

#[async_trait]
impl ClipRenderer for RemoteClipRenderer {
    fn name(&self) -> &'static str {
        "workflow"
    }

    async fn is_available(&self) -> bool {
        self.client.health_check().await.unwrap_or(false)
    }

    async fn render(&self, clip: &Clip) -> WorkerResult<RenderOutcome> {
        let payload = ClipWebhook {
            clip_id: clip.id.to_string(),
            video_id: clip.source_id.clone(),
            video_url: clip.source_url(),
            start_time: clip.start_time,
            end_time: clip.end_time,
            callback_url: self.callback_url.clone(),
        };
        self.client.dispatch_clip(&payload).await?;
        info!(clip_id = %clip.id, "Clip handed to workflow engine");
        Ok(RenderOutcome::Dispatched)
    }
}

/// Extracts clips with yt-dlp and FFmpeg, then publishes them.
pub struct LocalClipRenderer {
    extractor: ClipExtractor,
    store: Arc<dyn ArtifactStore>,
}

impl LocalClipRenderer {
    pub fn new(extractor: ClipExtractor, store: Arc<dyn ArtifactStore>) -> Self {
        Self { extractor, store }
    }

    /// yt-dlp downloader and FFmpeg encoder with the configured timeouts.
    pub fn from_config(config: &WorkerConfig, store: Arc<dyn ArtifactStore>) -> Self {
        let downloader = YtDlpDownloader::new(
            ToolRunner::new("yt-dlp").with_timeout(config.download_timeout_secs),
            config.cookies_path.clone(),
        );
        let encoder = FfmpegEncoder::new(ToolRunner::new("ffmpeg").with_timeout(config.encode_timeout_secs));

        Self::new(
            ClipExtractor::new(
                Arc::new(downloader),
                Arc::new(encoder),
                &config.work_dir,
                &config.output_dir,
            ),
            store,
        )
    }
}

#[async_trait]
impl ClipRenderer for LocalClipRenderer {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn render(&self, clip: &Clip) -> WorkerResult<RenderOutcome> {
        let request = ExtractRequest {
            clip_id: clip.id.to_string(),
            source_url: clip.source_url(),
            start: clip.start_time,
            end: clip.end_time,
        };

        let extracted = self.extractor.extract(&request).await?;

        match self.store.publish(clip.id.as_str(), &extracted.file_path).await {
            Ok(url) => Ok(RenderOutcome::Ready(url)),
            Err(e) => {
                warn!(clip_id = %clip.id, store = self.store.kind(), "Publishing clip failed: {}", e);
                clipgen_media::fs_utils::remove_if_exists(&extracted.file_path).await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use clipgen_media::{Downloader, Encoder, MediaError, MediaResult};
    use clipgen_storage::LocalArtifactStore;
    use std::path::Path;
    use tempfile::TempDir;

    struct FakeDownloader;

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, _url: &str, output: &Path) -> MediaResult<()> {
            tokio::fs::write(output, b"source").await?;
            Ok(())
        }
    }

    struct FakeEncoder {
        fail: bool,
    }

    #[async_trait]
    impl Encoder for FakeEncoder {
        async fn encode(&self, _input: &Path, output: &Path, _start: f64, _duration: f64) -> MediaResult<()> {
            if self.fail {
                return Err(MediaError::timeout("ffmpeg", 300));
            }
            tokio::fs::write(output, b"clip").await?;
            Ok(())
        }
    }

    fn renderer(dir: &TempDir, fail: bool) -> LocalClipRenderer {
        let extractor = ClipExtractor::new(
            Arc::new(FakeDownloader),
            Arc::new(FakeEncoder { fail }),
            dir.path().join("work"),
            dir.path().join("clips"),
        );
        let store = LocalArtifactStore::new(dir.path().join("clips"), "http://localhost:8000");
        LocalClipRenderer::new(extractor, Arc::new(store))
    }

    #[tokio::test]
    async fn test_local_render_publishes() {
        let dir = TempDir::new().unwrap();
        let clip = Clip::new("dQw4w9WgXcQ", 30, 60, None);

        let outcome = renderer(&dir, false).render(&clip).await.unwrap();

        assert_eq!(
            outcome,
            RenderOutcome::Ready(format!("http://localhost:8000/api/clips/{}/file", clip.id))
        );
        assert!(dir.path().join("clips").join(format!("clip_{}.mp4", clip.id)).exists());
    }

    #[tokio::test]
    async fn test_local_render_timeout_message() {
        let dir = TempDir::new().unwrap();
        let clip = Clip::new("dQw4w9WgXcQ", 30, 60, None);

        let err = renderer(&dir, true).render(&clip).await.unwrap_err();

        assert!(matches!(err, WorkerError::Media(_)));
        assert_eq!(err.user_message(), "Clip extraction timed out after 300s");
        assert!(!dir.path().join("clips").join(format!("clip_{}.mp4", clip.id)).exists());
    }
}
