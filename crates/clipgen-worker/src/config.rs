//! Worker configuration.

use std::path::PathBuf;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scratch directory for source downloads
    pub work_dir: PathBuf,
    /// Where finished clips are written before publishing
    pub output_dir: PathBuf,
    /// Maximum normalized transcript length in characters
    pub transcript_max_chars: usize,
    /// Caption language requested from yt-dlp
    pub caption_lang: String,
    pub metadata_timeout_secs: u64,
    pub caption_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub encode_timeout_secs: u64,
    /// Externally reachable base URL of this service, used for callback
    /// addresses and local download links
    pub public_base_url: String,
    /// Netscape cookies file passed to yt-dlp
    pub cookies_path: Option<PathBuf>,
    /// Records still processing after this long are failed by the sweeper
    pub stale_after_secs: u64,
    pub stale_sweep_interval_secs: u64,
    pub stale_sweep_enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/clipgen/work"),
            output_dir: PathBuf::from("/tmp/clipgen/clips"),
            transcript_max_chars: 6000,
            caption_lang: "en".to_string(),
            metadata_timeout_secs: 30,
            caption_timeout_secs: 60,
            download_timeout_secs: 600,
            encode_timeout_secs: 300,
            public_base_url: "http://localhost:8000".to_string(),
            cookies_path: None,
            stale_after_secs: 1800,
            stale_sweep_interval_secs: 60,
            stale_sweep_enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            work_dir: std::env::var("WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            transcript_max_chars: std::env::var("TRANSCRIPT_MAX_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.transcript_max_chars),
            caption_lang: std::env::var("CAPTION_LANG").unwrap_or(defaults.caption_lang),
            metadata_timeout_secs: std::env::var("METADATA_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.metadata_timeout_secs),
            caption_timeout_secs: std::env::var("CAPTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.caption_timeout_secs),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.download_timeout_secs),
            encode_timeout_secs: std::env::var("ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.encode_timeout_secs),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            cookies_path: std::env::var("YTDLP_COOKIES")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            stale_after_secs: std::env::var("STALE_RECORD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.stale_after_secs),
            stale_sweep_interval_secs: std::env::var("STALE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.stale_sweep_interval_secs),
            stale_sweep_enabled: std::env::var("ENABLE_STALE_DETECTION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.stale_sweep_enabled),
        }
    }

    pub fn analysis_callback_url(&self) -> String {
        format!("{}/api/callbacks/analysis", self.public_base_url)
    }

    pub fn clip_callback_url(&self) -> String {
        format!("{}/api/callbacks/clip", self.public_base_url)
    }
}
