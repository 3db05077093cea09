//! Caption and metadata sources feeding analysis.

use std::sync::Arc;

use async_trait::async_trait;
use clipgen_media::{fetch_captions, probe_metadata, MediaResult, SourceMetadata, ToolRunner};
use tracing::{debug, warn};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::transcript::normalize_vtt;

/// Raw caption track for a source.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch(&self, source_url: &str) -> MediaResult<String>;
}

/// Duration and title for a source.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn probe(&self, source_url: &str) -> MediaResult<SourceMetadata>;
}

pub struct YtDlpCaptionSource {
    runner: ToolRunner,
    lang: String,
}

impl YtDlpCaptionSource {
    pub fn new(runner: ToolRunner, lang: impl Into<String>) -> Self {
        Self {
            runner,
            lang: lang.into(),
        }
    }
}

#[async_trait]
impl CaptionSource for YtDlpCaptionSource {
    async fn fetch(&self, source_url: &str) -> MediaResult<String> {
        fetch_captions(&self.runner, source_url, &self.lang).await
    }
}

pub struct YtDlpMetadataSource {
    runner: ToolRunner,
}

impl YtDlpMetadataSource {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MetadataSource for YtDlpMetadataSource {
    async fn probe(&self, source_url: &str) -> MediaResult<SourceMetadata> {
        probe_metadata(&self.runner, source_url).await
    }
}

/// Everything a provider may use to find highlights.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub transcript: String,
    /// Latest cue start, whole seconds
    pub max_timestamp: u32,
    /// Whole seconds; falls back to `max_timestamp` when the probe fails
    pub duration: u32,
    pub title: Option<String>,
}

/// Fetches captions and metadata concurrently.
#[derive(Clone)]
pub struct InputGatherer {
    captions: Arc<dyn CaptionSource>,
    metadata: Arc<dyn MetadataSource>,
    max_chars: usize,
}

impl InputGatherer {
    pub fn new(
        captions: Arc<dyn CaptionSource>,
        metadata: Arc<dyn MetadataSource>,
        max_chars: usize,
    ) -> Self {
        Self {
            captions,
            metadata,
            max_chars,
        }
    }

    /// yt-dlp backed sources using the configured timeouts.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let caption_runner = ToolRunner::new("yt-dlp").with_timeout(config.caption_timeout_secs);
        let probe_runner = ToolRunner::new("yt-dlp").with_timeout(config.metadata_timeout_secs);

        Self::new(
            Arc::new(YtDlpCaptionSource::new(caption_runner, config.caption_lang.clone())),
            Arc::new(YtDlpMetadataSource::new(probe_runner)),
            config.transcript_max_chars,
        )
    }

    /// Transcript, duration and title for a source.
    ///
    /// Caption failures are fatal and carry the user-facing message. Metadata
    /// failures are logged and replaced by `max_timestamp` and no title.
    pub async fn gather(&self, source_url: &str) -> WorkerResult<AnalysisInput> {
        let (captions, metadata) = tokio::join!(
            self.captions.fetch(source_url),
            self.metadata.probe(source_url)
        );

        let raw = captions.map_err(WorkerError::from_caption_failure)?;
        let normalized = normalize_vtt(&raw, self.max_chars)?;

        let (duration, title) = match metadata {
            Ok(meta) if meta.duration_secs > 0.0 => {
                (meta.duration_secs.round() as u32, meta.title)
            }
            Ok(meta) => {
                debug!(url = %source_url, "Metadata probe returned no duration");
                (0, meta.title)
            }
            Err(e) => {
                warn!(url = %source_url, "Metadata unavailable: {}", e);
                (0, None)
            }
        };

        let duration = if duration == 0 {
            normalized.max_timestamp
        } else {
            duration
        };

        Ok(AnalysisInput {
            transcript: normalized.transcript,
            max_timestamp: normalized.max_timestamp,
            duration,
            title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipgen_media::MediaError;
    use std::time::Duration;

    struct FixedCaptions(Option<&'static str>);

    #[async_trait]
    impl CaptionSource for FixedCaptions {
        async fn fetch(&self, _source_url: &str) -> MediaResult<String> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            match self.0 {
                Some(vtt) => Ok(vtt.to_string()),
                None => Err(MediaError::CaptionsUnavailable("no caption track found".into())),
            }
        }
    }

    struct FixedMetadata(Option<f64>);

    #[async_trait]
    impl MetadataSource for FixedMetadata {
        async fn probe(&self, _source_url: &str) -> MediaResult<SourceMetadata> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            match self.0 {
                Some(duration_secs) => Ok(SourceMetadata {
                    duration_secs,
                    title: Some("Never Gonna Give You Up".to_string()),
                }),
                None => Err(MediaError::timeout("yt-dlp", 30)),
            }
        }
    }

    const VTT: &str = "WEBVTT

00:00:05.000 --> 00:00:08.000
intro

00:01:40.000 --> 00:01:42.000
outro
";

    fn gatherer(captions: Option<&'static str>, duration: Option<f64>) -> InputGatherer {
        InputGatherer::new(
            Arc::new(FixedCaptions(captions)),
            Arc::new(FixedMetadata(duration)),
            6000,
        )
    }

    #[tokio::test]
    async fn test_gather_uses_probe_duration() {
        let input = gatherer(Some(VTT), Some(212.4)).gather("url").await.unwrap();
        assert_eq!(input.duration, 212);
        assert_eq!(input.max_timestamp, 100);
        assert_eq!(input.title.as_deref(), Some("Never Gonna Give You Up"));
        assert_eq!(input.transcript, "[5s] intro [100s] outro ");
    }

    #[tokio::test]
    async fn test_gather_falls_back_to_max_timestamp() {
        let input = gatherer(Some(VTT), None).gather("url").await.unwrap();
        assert_eq!(input.duration, 100);
        assert!(input.title.is_none());
    }

    struct BarrierCaptions(Arc<tokio::sync::Barrier>);

    #[async_trait]
    impl CaptionSource for BarrierCaptions {
        async fn fetch(&self, _source_url: &str) -> MediaResult<String> {
            self.0.wait().await;
            Ok(VTT.to_string())
        }
    }

    struct BarrierMetadata(Arc<tokio::sync::Barrier>);

    #[async_trait]
    impl MetadataSource for BarrierMetadata {
        async fn probe(&self, _source_url: &str) -> MediaResult<SourceMetadata> {
            self.0.wait().await;
            Ok(SourceMetadata {
                duration_secs: 10.0,
                title: None,
            })
        }
    }

    #[tokio::test]
    async fn test_gather_runs_sources_concurrently() {
        // Both sources block until the other has started
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let gatherer = InputGatherer::new(
            Arc::new(BarrierCaptions(barrier.clone())),
            Arc::new(BarrierMetadata(barrier)),
            6000,
        );

        let input = tokio::time::timeout(Duration::from_secs(2), gatherer.gather("url"))
            .await
            .expect("caption fetch and probe were not run concurrently")
            .unwrap();
        assert_eq!(input.duration, 10);
    }

    #[tokio::test]
    async fn test_gather_without_captions_fails() {
        let err = gatherer(None, Some(212.0)).gather("url").await.unwrap_err();
        assert!(matches!(err, WorkerError::NoCaptionsAvailable));
    }
}
