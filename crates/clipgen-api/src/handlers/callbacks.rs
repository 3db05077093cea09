//! Completion callbacks from the workflow engine.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use clipgen_models::{AnalysisCallback, CallbackAck, ClipCallback};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const CALLBACK_SECRET_HEADER: &str = "X-Callback-Secret";

/// Resolve an analysis job from the engine's result.
pub async fn analysis_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(callback): Json<AnalysisCallback>,
) -> ApiResult<Json<CallbackAck>> {
    verify_secret(&state, &headers)?;

    let job = state.orchestrator.handle_analysis_callback(callback).await?;
    Ok(Json(CallbackAck {
        received: true,
        status: job.status.to_string(),
    }))
}

/// Resolve a clip from the engine's result.
pub async fn clip_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(callback): Json<ClipCallback>,
) -> ApiResult<Json<CallbackAck>> {
    verify_secret(&state, &headers)?;

    let clip = state.orchestrator.handle_clip_callback(callback).await?;
    Ok(Json(CallbackAck {
        received: true,
        status: clip.status.to_string(),
    }))
}

fn verify_secret(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.config.callback_secret.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        warn!("Rejected callback with missing or wrong secret");
        Err(ApiError::unauthorized("Invalid callback secret"))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
        assert!(!constant_time_eq(b"", b"secret"));
    }
}
