//! Timestamp parsing and formatting.
//!
//! Caption cues use `HH:MM:SS.mmm` (or `MM:SS.mmm`) timings; highlights are
//! displayed with a compact `M:SS` / `H:MM:SS` clock label.

use thiserror::Error;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS.mmm, MM:SS.mmm, or SS")]
    InvalidFormat(String),
}

/// Parse a timestamp string to total seconds.
///
/// Accepts `HH:MM:SS[.mmm]`, `MM:SS[.mmm]` and `SS[.mmm]`. A comma is
/// accepted as the millisecond separator.
///
/// # Examples
/// ```
/// use clipgen_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30.500").unwrap(), 330.5);
/// assert_eq!(parse_timestamp("90").unwrap(), 90.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let normalized = ts.replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    let labels: &[&'static str] = match parts.len() {
        1 => &["seconds"],
        2 => &["minutes", "seconds"],
        3 => &["hours", "minutes", "seconds"],
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    let mut total = 0.0;
    for (part, label) in parts.iter().zip(labels) {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(*label, part.to_string()))?;
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    Ok(total)
}

/// Format whole seconds as `M:SS`, or `H:MM:SS` past the hour.
pub fn format_clock(total_secs: u32) -> String {
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
