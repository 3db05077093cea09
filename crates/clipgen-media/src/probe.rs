//! Source metadata probe using yt-dlp.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};

/// Metadata about a remote source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Duration in seconds
    pub duration_secs: f64,
    pub title: Option<String>,
}

/// Query duration and title without downloading anything.
pub async fn probe_metadata(runner: &ToolRunner, url: &str) -> MediaResult<SourceMetadata> {
    let args: Vec<String> = [
        "--skip-download",
        "--no-playlist",
        "--no-warnings",
        "--print",
        "duration",
        "--print",
        "title",
        url,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let output = runner.run(&args).await?;
    debug!("yt-dlp metadata output: {}", output.stdout.trim());
    parse_print_output(&output.stdout)
}

/// Parse `--print duration --print title` output: one value per line.
pub fn parse_print_output(stdout: &str) -> MediaResult<SourceMetadata> {
    let mut lines = stdout.lines().map(str::trim);

    let raw_duration = lines.next().unwrap_or_default();
    let duration_secs: f64 = raw_duration
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d > 0.0)
        .ok_or_else(|| {
            MediaError::MetadataUnavailable(format!("unparseable duration {:?}", raw_duration))
        })?;

    let title = lines
        .next()
        .filter(|t| !t.is_empty() && *t != "NA")
        .map(str::to_string);

    Ok(SourceMetadata {
        duration_secs,
        title,
    })
}
