//! WebVTT caption normalization.
//!
//! Turns a raw caption track into a compact, timestamped transcript suitable
//! for prompting. Long transcripts are sampled from the beginning, middle and
//! end instead of being cut off after the opening minutes.

use clipgen_models::parse_timestamp;

use crate::error::{WorkerError, WorkerResult};

pub const MIDDLE_MARKER: &str = " [...MIDDLE OF VIDEO...] ";
pub const END_MARKER: &str = " [...END OF VIDEO...] ";

/// Transcript text plus the latest cue start seen, in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTranscript {
    pub transcript: String,
    pub max_timestamp: u32,
}

/// Normalize a WebVTT document.
///
/// Fails with [`WorkerError::NoCaptionsAvailable`] when no cue text survives.
pub fn normalize_vtt(raw: &str, max_chars: usize) -> WorkerResult<NormalizedTranscript> {
    let mut transcript = String::new();
    let mut max_timestamp = 0u32;
    let mut cue_start: Option<u32> = None;
    let mut last_emitted: Option<String> = None;

    for line in raw.lines() {
        let line = line.trim();

        if line.is_empty() {
            cue_start = None;
            continue;
        }

        if line.contains("-->") {
            let start = line
                .split("-->")
                .next()
                .and_then(|s| parse_timestamp(s).ok())
                .map(|secs| secs.floor() as u32);
            if let Some(secs) = start {
                max_timestamp = max_timestamp.max(secs);
            }
            cue_start = start;
            continue;
        }

        if is_structural(line) {
            continue;
        }

        // Text outside a cue (NOTE/STYLE bodies, header metadata)
        let Some(secs) = cue_start else {
            continue;
        };

        let text = clean_text(line);
        if text.is_empty() || last_emitted.as_deref() == Some(text.as_str()) {
            continue;
        }

        transcript.push_str(&format!("[{}s] {} ", secs, text));
        last_emitted = Some(text);
    }

    if transcript.is_empty() {
        return Err(WorkerError::NoCaptionsAvailable);
    }

    Ok(NormalizedTranscript {
        transcript: sample(&transcript, max_chars),
        max_timestamp,
    })
}

fn is_structural(line: &str) -> bool {
    line.starts_with("WEBVTT")
        || line.starts_with("Kind:")
        || line.starts_with("Language:")
        || line.starts_with("NOTE")
        || line.starts_with("STYLE")
        || line.starts_with("REGION")
        || line.chars().all(|c| c.is_ascii_digit())
}

/// Strip inline tags, decode the common entities, trim.
fn clean_text(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_tag = false;

    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// Head, middle and tail sample of `text` when it exceeds `max_chars`.
///
/// Budgets are 40/30/30 percent of `max_chars`; the middle slice starts at 40%
/// of the full text. Counts are in characters.
pub fn sample(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total <= max_chars {
        return text.to_string();
    }

    let head_len = max_chars * 40 / 100;
    let mid_len = max_chars * 30 / 100;
    let tail_len = max_chars - head_len - mid_len;

    let mid_start = total * 40 / 100;
    let mid_end = (mid_start + mid_len).min(total);

    let mut out = String::with_capacity(max_chars * 4 + MIDDLE_MARKER.len() + END_MARKER.len());
    out.extend(&chars[..head_len]);
    out.push_str(MIDDLE_MARKER);
    out.extend(&chars[mid_start..mid_end]);
    out.push_str(END_MARKER);
    out.extend(&chars[total - tail_len..]);
    out
}
