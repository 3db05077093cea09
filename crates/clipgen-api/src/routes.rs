//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::analysis::{analyze, get_job, get_results};
use crate::handlers::callbacks::{analysis_callback, clip_callback};
use crate::handlers::clips::{create_clip, get_clip, get_clip_file};
use crate::handlers::{health, ready, root};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let analysis_routes = Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/:job_id", get(get_job))
        .route("/results/:video_id", get(get_results));

    let clip_routes = Router::new()
        .route("/clips", post(create_clip))
        .route("/clips/:clip_id", get(get_clip))
        .route("/clips/:clip_id/file", get(get_clip_file));

    // Called by the workflow engine; not rate limited
    let callback_routes = Router::new()
        .route("/callbacks/analysis", post(analysis_callback))
        .route("/callbacks/clip", post(clip_callback));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(analysis_routes)
        .merge(clip_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .merge(callback_routes);

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
