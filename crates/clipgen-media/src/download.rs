//! Video download using yt-dlp.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::ToolRunner;
use crate::error::{MediaError, MediaResult};

/// Format selector capping downloads at 720p; full-source download dominates
/// clip latency and the clips are re-encoded anyway.
pub const FORMAT_MAX_720P: &str = "bestvideo[height<=720]+bestaudio/best[height<=720]";

/// Build the yt-dlp arguments for a capped, merged mp4 download.
pub fn download_args(url: &str, output_path: &Path, cookies: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = [
        "--no-playlist",
        "--no-progress",
        "-f",
        FORMAT_MAX_720P,
        "--merge-output-format",
        "mp4",
        "-o",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(output_path.to_string_lossy().to_string());

    if let Some(cookies) = cookies {
        args.push("--cookies".to_string());
        args.push(cookies.to_string_lossy().to_string());
    }

    args.push(url.to_string());
    args
}

/// Sidecar files yt-dlp may leave next to `output_path` when interrupted.
pub fn partial_paths(output_path: &Path) -> Vec<PathBuf> {
    ["part", "ytdl"]
        .iter()
        .map(|ext| {
            let mut name = output_path.as_os_str().to_os_string();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        })
        .collect()
}

/// Download a video with yt-dlp into `output_path`.
///
/// Timeouts are returned unchanged so callers can tell them apart from
/// ordinary failures.
pub async fn download_video(
    runner: &ToolRunner,
    url: &str,
    output_path: &Path,
    cookies: Option<&Path>,
) -> MediaResult<()> {
    info!("Downloading video from {} to {}", url, output_path.display());

    let args = download_args(url, output_path, cookies);
    match runner.run(&args).await {
        Ok(_) => {}
        Err(MediaError::CommandFailed { message, .. }) => {
            warn!(url = %url, "yt-dlp download failed: {}", message);
            return Err(MediaError::download_failed(format!("yt-dlp failed: {}", message)));
        }
        Err(e) => return Err(e),
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("Output file not created"));
    }

    let file_size = tokio::fs::metadata(output_path).await?.len();
    info!(
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded video successfully"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_args_cap_quality() {
        let args = download_args(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            Path::new("/tmp/work/abc_source.mp4"),
            None,
        );

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], FORMAT_MAX_720P);
        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "/tmp/work/abc_source.mp4");
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert!(!args.contains(&"--cookies".to_string()));
    }

    #[test]
    fn test_download_args_with_cookies() {
        let args = download_args(
            "https://youtu.be/x",
            Path::new("out.mp4"),
            Some(Path::new("/app/cookies.txt")),
        );
        let c = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[c + 1], "/app/cookies.txt");
    }

    #[test]
    fn test_partial_paths() {
        let paths = partial_paths(Path::new("/tmp/a_source.mp4"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/tmp/a_source.mp4.part"),
                PathBuf::from("/tmp/a_source.mp4.ytdl")
            ]
        );
    }
}
