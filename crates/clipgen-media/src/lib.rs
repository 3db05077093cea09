//! yt-dlp and FFmpeg CLI wrappers.
//!
//! This crate provides:
//! - A subprocess runner with hard timeouts
//! - Caption track fetch and metadata probing via yt-dlp
//! - Source download capped at 720p
//! - Clip extraction with guaranteed cleanup of intermediate files

pub mod captions;
pub mod clip;
pub mod command;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod probe;

pub use captions::fetch_captions;
pub use clip::{
    failure_message, ClipExtractor, Downloader, Encoder, ExtractRequest, ExtractedClip,
    FfmpegEncoder, YtDlpDownloader,
};
pub use command::{check_ffmpeg, check_ytdlp, FfmpegCommand, ToolOutput, ToolRunner};
pub use download::download_video;
pub use error::{MediaError, MediaResult};
pub use probe::{probe_metadata, SourceMetadata};
