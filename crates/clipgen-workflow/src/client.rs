//! Workflow engine HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{AnalysisWebhook, ClipWebhook, HealthResponse};

/// Configuration for the workflow client.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Base URL of the engine
    pub base_url: String,
    pub analyze_path: String,
    pub clip_path: String,
    /// Liveness probe timeout
    pub probe_timeout: Duration,
    /// Webhook request timeout
    pub timeout: Duration,
    /// Max retries for webhook delivery
    pub max_retries: u32,
}

impl WorkflowConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            analyze_path: "/webhook/analyze".to_string(),
            clip_path: "/webhook/clip".to_string(),
            probe_timeout: Duration::from_millis(2000),
            timeout: Duration::from_secs(30),
            max_retries: 1,
        }
    }

    /// Create config from environment variables.
    ///
    /// Returns `None` when `WORKFLOW_BASE_URL` is unset; the engine is then
    /// never probed.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("WORKFLOW_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        let defaults = Self::new(base_url);

        Some(Self {
            analyze_path: std::env::var("WORKFLOW_ANALYZE_PATH").unwrap_or(defaults.analyze_path.clone()),
            clip_path: std::env::var("WORKFLOW_CLIP_PATH").unwrap_or(defaults.clip_path.clone()),
            probe_timeout: Duration::from_millis(
                std::env::var("WORKFLOW_PROBE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            timeout: Duration::from_secs(
                std::env::var("WORKFLOW_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("WORKFLOW_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            ..defaults
        })
    }
}

/// Client for the remote workflow engine.
#[derive(Clone)]
pub struct WorkflowClient {
    http: Client,
    config: WorkflowConfig,
}

impl WorkflowClient {
    pub fn new(config: WorkflowConfig) -> WorkflowResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("clipgen-workflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WorkflowError::Network)?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Probe `GET <base>/healthz`. Any failure counts as unreachable.
    pub async fn health_check(&self) -> WorkflowResult<bool> {
        let url = format!("{}/healthz", self.config.base_url);

        match self
            .http
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.unwrap_or_default();
                let health: HealthResponse = serde_json::from_str(&body).unwrap_or_default();
                Ok(match health.status.as_deref() {
                    None => true,
                    Some(s) => matches!(s, "ok" | "healthy" | "up"),
                })
            }
            Ok(response) => {
                warn!("Workflow engine health check failed: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                debug!("Workflow engine unreachable: {}", e);
                Ok(false)
            }
        }
    }

    /// Hand an analysis job to the engine.
    pub async fn dispatch_analysis(&self, payload: &AnalysisWebhook) -> WorkflowResult<()> {
        let url = format!("{}{}", self.config.base_url, self.config.analyze_path);
        debug!(job_id = %payload.job_id, "Dispatching analysis webhook to {}", url);
        self.post_webhook(&url, payload).await
    }

    /// Hand a clip request to the engine.
    pub async fn dispatch_clip(&self, payload: &ClipWebhook) -> WorkflowResult<()> {
        let url = format!("{}{}", self.config.base_url, self.config.clip_path);
        debug!(clip_id = %payload.clip_id, "Dispatching clip webhook to {}", url);
        self.post_webhook(&url, payload).await
    }

    async fn post_webhook<T: Serialize>(&self, url: &str, payload: &T) -> WorkflowResult<()> {
        self.with_retry(|| async {
            let response = self.http.post(url).json(payload).send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                let body = response.text().await.unwrap_or_default();
                Err(WorkflowError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        })
        .await
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> WorkflowResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = WorkflowResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(250 * 2u64.pow(attempt));
                    warn!(
                        "Webhook delivery failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WorkflowClient {
        let mut config = WorkflowConfig::new(server.uri());
        config.probe_timeout = Duration::from_millis(500);
        WorkflowClient::new(config).unwrap()
    }

    fn clip_payload() -> ClipWebhook {
        ClipWebhook {
            clip_id: "c1".to_string(),
            video_id: "dQw4w9WgXcQ".to_string(),
            video_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            start_time: 30,
            end_time: 60,
            callback_url: "http://api/api/callbacks/clip".to_string(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = WorkflowConfig::new("http://engine:5678/");
        assert_eq!(config.base_url, "http://engine:5678");
        assert_eq!(config.analyze_path, "/webhook/analyze");
        assert_eq!(config.clip_path, "/webhook/clip");
        assert_eq!(config.probe_timeout, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_health_check_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
            .mount(&server)
            .await;

        assert!(client(&server).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_empty_body_counts_as_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(client(&server).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!client(&server).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_slow_engine_is_down() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        assert!(!client(&server).health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let mut config = WorkflowConfig::new("http://127.0.0.1:9");
        config.probe_timeout = Duration::from_millis(200);
        let client = WorkflowClient::new(config).unwrap();

        assert!(!client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_analysis_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/analyze"))
            .and(body_partial_json(serde_json::json!({
                "job_id": "j1",
                "video_id": "dQw4w9WgXcQ",
                "duration": 212,
                "callback_url": "http://api/api/callbacks/analysis"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let payload = AnalysisWebhook {
            job_id: "j1".to_string(),
            video_id: "dQw4w9WgXcQ".to_string(),
            video_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            video_title: "Never Gonna Give You Up".to_string(),
            transcript: "[0s] hello ".to_string(),
            duration: 212,
            callback_url: "http://api/api/callbacks/analysis".to_string(),
        };
        client(&server).dispatch_analysis(&payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_clip_retries_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/clip"))
            .respond_with(ResponseTemplate::new(502))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server).dispatch_clip(&clip_payload()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Rejected { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_dispatch_clip_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/clip"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such workflow"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).dispatch_clip(&clip_payload()).await.unwrap_err();
        match err {
            WorkflowError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no such workflow");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
