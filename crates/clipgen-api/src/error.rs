//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clipgen_worker::WorkerError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidSource(String),

    #[error("{0}")]
    MissingTimeRange(String),

    #[error("{0}")]
    InvalidTimeRange(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyResolved(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidSource(_)
            | ApiError::MissingTimeRange(_)
            | ApiError::InvalidTimeRange(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyResolved(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidSource(_) => "invalid_source",
            ApiError::MissingTimeRange(_) => "missing_time_range",
            ApiError::InvalidTimeRange(_) => "invalid_time_range",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::AlreadyResolved(_) => "already_resolved",
            ApiError::RateLimited => "rate_limited",
            ApiError::Upstream(_) => "upstream_failure",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match &err {
            WorkerError::InvalidSource(_) | WorkerError::MissingSource => {
                Self::InvalidSource(err.to_string())
            }
            WorkerError::MissingTimeRange => Self::MissingTimeRange(err.to_string()),
            WorkerError::InvalidTimeRange { .. } => Self::InvalidTimeRange(err.to_string()),
            WorkerError::NotFound(msg) => Self::NotFound(msg.clone()),
            WorkerError::AlreadyResolved(_) => Self::AlreadyResolved(err.to_string()),
            WorkerError::Registry(_) | WorkerError::Workflow(_) | WorkerError::Upstream(_) => {
                Self::Upstream(err.to_string())
            }
            _ => Self::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Upstream(_) => {
                error!("Request failed: {}", self);
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipgen_models::{SourceIdError, TransitionError};
    use clipgen_registry::RegistryError;

    #[test]
    fn test_worker_error_mapping() {
        let cases = [
            (WorkerError::from(SourceIdError::VideoIdNotFound), StatusCode::BAD_REQUEST),
            (WorkerError::MissingTimeRange, StatusCode::BAD_REQUEST),
            (WorkerError::MissingSource, StatusCode::BAD_REQUEST),
            (WorkerError::InvalidTimeRange { start: 60, end: 30 }, StatusCode::BAD_REQUEST),
            (WorkerError::not_found("Job not found"), StatusCode::NOT_FOUND),
            (
                WorkerError::AlreadyResolved(TransitionError::AlreadyResolved {
                    kind: "job",
                    id: "j1".into(),
                    status: "complete",
                }),
                StatusCode::CONFLICT,
            ),
            (
                WorkerError::from(RegistryError::ServerError(503, "down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (WorkerError::NoCaptionsAvailable, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_invalid_source_keeps_message() {
        let err = ApiError::from(WorkerError::from(SourceIdError::VideoIdNotFound));
        assert_eq!(err.code(), "invalid_source");
        assert_eq!(
            err.to_string(),
            "Invalid YouTube URL. Please provide a valid YouTube video link."
        );
    }

    #[test]
    fn test_missing_source_is_not_a_range_error() {
        let err = ApiError::from(WorkerError::MissingSource);
        assert_eq!(err.code(), "invalid_source");
        assert!(err.to_string().starts_with("video_id is required"));
    }
}
