//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "clipgen_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "clipgen_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "clipgen_http_requests_in_flight";
    pub const RATE_LIMIT_HITS_TOTAL: &str = "clipgen_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Collapse ids in a request path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut out = Vec::new();
    let mut placeholder = None;

    for segment in path.split('/') {
        if let Some(name) = placeholder.take() {
            out.push(name);
            continue;
        }
        placeholder = match segment {
            "analyze" => Some(":job_id"),
            "results" => Some(":video_id"),
            "clips" => Some(":clip_id"),
            _ => None,
        };
        out.push(segment);
    }

    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/analyze/550e8400-e29b-41d4-a716-446655440000"),
            "/api/analyze/:job_id"
        );
        assert_eq!(sanitize_path("/api/analyze"), "/api/analyze");
        assert_eq!(sanitize_path("/api/results/dQw4w9WgXcQ"), "/api/results/:video_id");
        assert_eq!(sanitize_path("/api/clips/abc/file"), "/api/clips/:clip_id/file");
        assert_eq!(sanitize_path("/api/callbacks/clip"), "/api/callbacks/clip");
    }
}
