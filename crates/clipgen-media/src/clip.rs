//! Clip extraction: download the source, cut and re-encode a range.
//!
//! Temporary and output files are namespaced by clip id, so concurrent
//! extractions can share the same directories.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::command::{FfmpegCommand, ToolRunner};
use crate::download::{download_video, partial_paths};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_if_exists;

/// Fetches a full source video to a local path.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, output: &Path) -> MediaResult<()>;
}

/// Cuts `[start, start + duration)` out of a local file into a web-playable file.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, input: &Path, output: &Path, start: f64, duration: f64)
        -> MediaResult<()>;
}

/// yt-dlp backed [`Downloader`].
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    runner: ToolRunner,
    cookies: Option<PathBuf>,
}

impl YtDlpDownloader {
    pub fn new(runner: ToolRunner, cookies: Option<PathBuf>) -> Self {
        Self { runner, cookies }
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, output: &Path) -> MediaResult<()> {
        download_video(&self.runner, url, output, self.cookies.as_deref()).await
    }
}

/// FFmpeg backed [`Encoder`]: H.264/AAC with fast-start metadata.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    runner: ToolRunner,
    preset: String,
    crf: u8,
}

impl FfmpegEncoder {
    pub fn new(runner: ToolRunner) -> Self {
        Self {
            runner,
            preset: "fast".to_string(),
            crf: 23,
        }
    }

    pub fn command(&self, input: &Path, output: &Path, start: f64, duration: f64) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .seek(start)
            .duration(duration)
            .video_codec("libx264")
            .preset(self.preset.clone())
            .crf(self.crf)
            .audio_codec("aac")
            .audio_bitrate("128k")
            .faststart()
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        input: &Path,
        output: &Path,
        start: f64,
        duration: f64,
    ) -> MediaResult<()> {
        let cmd = self.command(input, output, start, duration);
        self.runner.run(&cmd.build_args()).await.map(|_| ())
    }
}

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub clip_id: String,
    pub source_url: String,
    /// Inclusive start, seconds
    pub start: u32,
    /// Exclusive end, seconds
    pub end: u32,
}

/// A finished clip file on local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedClip {
    pub file_path: PathBuf,
    pub file_name: String,
}

/// Produces clip files from remote sources.
///
/// Never retries; on any failure both the temporary download and the
/// (possibly partial) output are removed before the error is returned.
pub struct ClipExtractor {
    downloader: Arc<dyn Downloader>,
    encoder: Arc<dyn Encoder>,
    work_dir: PathBuf,
    output_dir: PathBuf,
}

impl ClipExtractor {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        encoder: Arc<dyn Encoder>,
        work_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            downloader,
            encoder,
            work_dir: work_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn file_name(clip_id: &str) -> String {
        format!("clip_{}.mp4", clip_id)
    }

    pub fn output_path(&self, clip_id: &str) -> PathBuf {
        self.output_dir.join(Self::file_name(clip_id))
    }

    pub fn temp_path(&self, clip_id: &str) -> PathBuf {
        self.work_dir.join(format!("{}_source.mp4", clip_id))
    }

    /// Download and cut one clip.
    pub async fn extract(&self, request: &ExtractRequest) -> MediaResult<ExtractedClip> {
        if request.end <= request.start {
            return Err(MediaError::internal(format!(
                "invalid range {}..{}",
                request.start, request.end
            )));
        }

        let temp_path = self.temp_path(&request.clip_id);
        let output_path = self.output_path(&request.clip_id);

        let result = self.run(request, &temp_path, &output_path).await;

        remove_if_exists(&temp_path).await;
        for partial in partial_paths(&temp_path) {
            remove_if_exists(partial).await;
        }

        match result {
            Ok(()) => {
                info!(
                    clip_id = %request.clip_id,
                    output = %output_path.display(),
                    "Clip extracted"
                );
                Ok(ExtractedClip {
                    file_name: Self::file_name(&request.clip_id),
                    file_path: output_path,
                })
            }
            Err(e) => {
                warn!(clip_id = %request.clip_id, "Clip extraction failed: {}", e);
                remove_if_exists(&output_path).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &ExtractRequest,
        temp_path: &Path,
        output_path: &Path,
    ) -> MediaResult<()> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        self.downloader
            .download(&request.source_url, temp_path)
            .await?;

        let start = f64::from(request.start);
        let duration = f64::from(request.end - request.start);
        self.encoder
            .encode(temp_path, output_path, start, duration)
            .await?;

        if !output_path.exists() {
            return Err(MediaError::FileNotFound(output_path.to_path_buf()));
        }
        Ok(())
    }
}

/// User-facing message for a failed extraction.
pub fn failure_message(err: &MediaError) -> String {
    match err {
        MediaError::Timeout { secs, .. } => {
            format!("Clip extraction timed out after {}s", secs)
        }
        other => format!("Clip extraction failed: {}", other),
    }
}
