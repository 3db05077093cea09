//! Caption track fetch using yt-dlp.
//!
//! Subtitles are written as WebVTT into a throwaway directory, read back, and
//! the directory is removed when the function returns.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};

/// Build the yt-dlp arguments that fetch manual or automatic subtitles only.
pub fn caption_args(url: &str, lang: &str, out_dir: &Path) -> Vec<String> {
    let template = out_dir.join("%(id)s.%(ext)s");
    vec![
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        "--write-sub".to_string(),
        "--write-auto-sub".to_string(),
        "--sub-lang".to_string(),
        lang.to_string(),
        "--sub-format".to_string(),
        "vtt".to_string(),
        "-o".to_string(),
        template.to_string_lossy().to_string(),
        url.to_string(),
    ]
}

/// Fetch the raw WebVTT caption track for `url`.
///
/// Returns [`MediaError::CaptionsUnavailable`] when yt-dlp succeeds but the
/// video has no track in `lang`.
pub async fn fetch_captions(runner: &ToolRunner, url: &str, lang: &str) -> MediaResult<String> {
    let dir = TempDir::new()?;
    runner.run(&caption_args(url, lang, dir.path())).await?;

    let vtt_path = find_vtt(dir.path())
        .await?
        .ok_or_else(|| MediaError::CaptionsUnavailable("no caption track found".to_string()))?;

    let content = tokio::fs::read_to_string(&vtt_path).await?;
    info!(url = %url, bytes = content.len(), "Fetched caption track");
    Ok(content)
}

/// First `.vtt` file in `dir`, by name.
async fn find_vtt(dir: &Path) -> MediaResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "vtt") {
            found.push(path);
        }
    }

    found.sort();
    debug!("Caption files written: {:?}", found);
    Ok(found.into_iter().next())
}
