//! Source video identification.
//!
//! Every job and clip is keyed by the 11-character YouTube video id. This
//! module turns user-supplied URLs into that id and back into the canonical
//! watch URL handed to yt-dlp.

use thiserror::Error;
use url::Url;

/// Errors that can occur while extracting a source id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceIdError {
    #[error("URL is not a valid YouTube URL")]
    InvalidYoutubeUrl,

    #[error("Video ID has invalid format")]
    InvalidVideoId,

    #[error("Video ID not found in URL")]
    VideoIdNotFound,
}

pub type SourceIdResult<T> = Result<T, SourceIdError>;

/// Path prefixes on youtube.com whose next segment is the video id.
const ID_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts"];

const ID_LEN: usize = 11;

/// Extract the YouTube video id from a URL.
///
/// Supports `watch?v=`, `youtu.be/`, `/embed/`, `/v/` and `/shorts/` URLs,
/// with or without extra query parameters or fragments. A missing scheme is
/// treated as `https`.
pub fn extract_youtube_id(url: &str) -> SourceIdResult<String> {
    let url = url.trim();
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{}", url)))
        .map_err(|_| SourceIdError::InvalidYoutubeUrl)?;

    let candidate = match parsed.host_str() {
        Some("youtu.be") => first_segment(&parsed, 0),
        Some(host) if host == "youtube.com" || host.ends_with(".youtube.com") => parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .or_else(|| {
                let prefix = first_segment(&parsed, 0)?;
                ID_PATH_PREFIXES
                    .contains(&prefix.as_str())
                    .then(|| first_segment(&parsed, 1))
                    .flatten()
            }),
        _ => return Err(SourceIdError::InvalidYoutubeUrl),
    };

    match candidate.filter(|id| !id.is_empty()) {
        Some(id) => validate_source_id(&id).map(|_| id),
        None => Err(SourceIdError::VideoIdNotFound),
    }
}

fn first_segment(url: &Url, index: usize) -> Option<String> {
    url.path_segments()?.nth(index).map(str::to_string)
}

/// Check that `id` looks like a YouTube video id.
pub fn validate_source_id(id: &str) -> SourceIdResult<()> {
    let valid_chars = id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if id.len() == ID_LEN && valid_chars {
        Ok(())
    } else {
        Err(SourceIdError::InvalidVideoId)
    }
}

/// Canonical watch URL for a video id.
pub fn watch_url(source_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", source_id)
}
