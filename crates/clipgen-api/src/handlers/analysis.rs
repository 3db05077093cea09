//! Analysis handlers: start, poll, and look up results by video.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipgen_models::{AnalyzeRequest, JobId, JobResponse};
use clipgen_worker::AnalyzeOutcome;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Start analysis of a YouTube URL.
///
/// Returns 200 with the stored result when the video was already analyzed,
/// otherwise 202 with the new job id for polling.
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    let url = request.youtube_url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("youtube_url is required"));
    }

    match state.orchestrator.analyze(url).await? {
        AnalyzeOutcome::Cached(job) => Ok((StatusCode::OK, Json(JobResponse::from_job(job, true)))),
        AnalyzeOutcome::Started(job) => {
            info!(job_id = %job.id, video_id = %job.source_id, "Analysis accepted");
            Ok((StatusCode::ACCEPTED, Json(JobResponse::from_job(job, false))))
        }
    }
}

/// Poll an analysis job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job = state
        .orchestrator
        .job_status(&JobId::from_string(job_id))
        .await?;
    Ok(Json(JobResponse::from_job(job, false)))
}

/// Newest completed analysis for a video.
pub async fn get_results(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<JobResponse>> {
    let job = state.orchestrator.results_by_source(&video_id).await?;
    Ok(Json(JobResponse::from_job(job, true)))
}
