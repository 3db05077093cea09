//! Clip handlers: request, poll, and download.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use clipgen_models::{ClipId, ClipRequest, ClipResponse};
use clipgen_worker::ClipArtifact;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request a clip by explicit range or highlight reference.
pub async fn create_clip(
    State(state): State<AppState>,
    Json(request): Json<ClipRequest>,
) -> ApiResult<(StatusCode, Json<ClipResponse>)> {
    let clip = state.orchestrator.request_clip(request).await?;
    info!(clip_id = %clip.id, video_id = %clip.source_id, "Clip accepted");
    Ok((StatusCode::ACCEPTED, Json(ClipResponse::from(clip))))
}

/// Poll a clip.
pub async fn get_clip(
    State(state): State<AppState>,
    Path(clip_id): Path<String>,
) -> ApiResult<Json<ClipResponse>> {
    let clip = state
        .orchestrator
        .clip_status(&ClipId::from_string(clip_id))
        .await?;
    Ok(Json(ClipResponse::from(clip)))
}

/// Serve a ready clip's file, or redirect to its remote location.
pub async fn get_clip_file(
    State(state): State<AppState>,
    Path(clip_id): Path<String>,
) -> ApiResult<Response> {
    let clip_id = ClipId::from_string(clip_id);

    match state.orchestrator.clip_artifact(&clip_id).await? {
        ClipArtifact::Remote(url) => Ok(Redirect::temporary(&url).into_response()),
        ClipArtifact::Local(path) => {
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                warn!(clip_id = %clip_id, path = ?path, "Failed to open clip file: {}", e);
                ApiError::not_found("Clip file not found")
            })?;
            let size = file
                .metadata()
                .await
                .map_err(|e| ApiError::internal(format!("Failed to stat clip file: {}", e)))?
                .len();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(header::CONTENT_LENGTH, size)
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"clip_{}.mp4\"", clip_id),
                )
                .header(header::CACHE_CONTROL, "public, max-age=3600")
                .header("Cross-Origin-Resource-Policy", "cross-origin")
                .body(Body::from_stream(ReaderStream::new(file)))
                .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
        }
    }
}
