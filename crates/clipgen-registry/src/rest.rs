//! PostgREST row-store client.
//!
//! Jobs and clips live in two tables (`jobs`, `clips`) whose columns mirror the
//! serialized records. Highlights are stored as a jsonb array on the job row.
//! Resolution is a conditional PATCH filtered on `status=eq.processing`, so a
//! late writer gets zero rows back instead of overwriting a terminal record.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use clipgen_models::{Clip, ClipId, ClipResolution, Highlight, Job, JobId, JobResolution};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info_span, Instrument};

use crate::error::{RegistryError, RegistryResult};
use crate::metrics::record_request;
use crate::registry::Registry;
use crate::retry::{with_retry, RetryConfig};

const JOBS: &str = "jobs";
const CLIPS: &str = "clips";

/// Row-store connection settings.
#[derive(Debug, Clone)]
pub struct RestRegistryConfig {
    /// Project URL; `/rest/v1` is appended
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl RestRegistryConfig {
    /// Read `REGISTRY_URL` and `REGISTRY_API_KEY`.
    ///
    /// Returns `None` when either is unset; callers then use the in-memory
    /// registry.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("REGISTRY_URL").ok().filter(|s| !s.is_empty())?;
        let api_key = std::env::var("REGISTRY_API_KEY").ok().filter(|s| !s.is_empty())?;

        let timeout_secs: u64 = std::env::var("REGISTRY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Some(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig::from_env(),
        })
    }
}

/// Registry persisted through a PostgREST endpoint.
#[derive(Clone)]
pub struct RestRegistry {
    http: Client,
    rest_url: String,
    api_key: String,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct IdRow {
    id: String,
}

#[derive(Deserialize)]
struct HighlightsRow {
    #[serde(default)]
    highlights: Option<Vec<Highlight>>,
}

impl RestRegistry {
    pub fn new(config: RestRegistryConfig) -> RegistryResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("clipgen-registry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RegistryError::Network)?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            retry: config.retry,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Fetch rows matching `query`.
    async fn select<T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        query: &[(&str, String)],
    ) -> RegistryResult<Vec<T>> {
        let url = self.table_url(table);

        with_retry(&self.retry, operation, || {
            self.execute_request(operation, table, async {
                let response = self
                    .authed(self.http.get(&url))
                    .query(query)
                    .send()
                    .await?;
                Self::read_rows(&url, response).await
            })
        })
        .await
    }

    async fn insert<T: serde::Serialize + Sync>(
        &self,
        operation: &str,
        table: &str,
        row: &T,
    ) -> RegistryResult<()> {
        let url = self.table_url(table);

        self.execute_request(operation, table, async {
            let response = self
                .authed(self.http.post(&url))
                .header("Prefer", "return=minimal")
                .json(row)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(Self::handle_error_response(status, &url, response).await)
            }
        })
        .await
    }

    /// PATCH a row only while it is still processing. Returns the rows that
    /// changed.
    async fn patch_processing<T, B>(
        &self,
        operation: &str,
        table: &str,
        id: &str,
        body: &B,
    ) -> RegistryResult<Vec<T>>
    where
        T: DeserializeOwned,
        B: serde::Serialize + Sync,
    {
        let url = self.table_url(table);

        self.execute_request(operation, table, async {
            let response = self
                .authed(self.http.patch(&url))
                .query(&[
                    ("id", format!("eq.{}", id)),
                    ("status", "eq.processing".to_string()),
                ])
                .header("Prefer", "return=representation")
                .json(body)
                .send()
                .await?;
            Self::read_rows(&url, response).await
        })
        .await
    }

    async fn read_rows<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> RegistryResult<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(status, url, response).await);
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| RegistryError::InvalidResponse(format!("{} returned {}: {}", url, e, body)))
    }

    /// Execute a request with a tracing span and request metrics.
    async fn execute_request<T, F>(&self, operation: &str, table: &str, fut: F) -> RegistryResult<T>
    where
        F: std::future::Future<Output = RegistryResult<T>>,
    {
        let span = info_span!("registry_request", operation = %operation, table = %table);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    /// Ids of rows still processing that were created before `cutoff`.
    async fn stale_ids(
        &self,
        operation: &str,
        table: &str,
        cutoff: DateTime<Utc>,
    ) -> RegistryResult<Vec<String>> {
        let rows: Vec<IdRow> = self
            .select(
                operation,
                table,
                &[
                    ("select", "id".to_string()),
                    ("status", "eq.processing".to_string()),
                    (
                        "created_at",
                        format!("lt.{}", cutoff.to_rfc3339_opts(SecondsFormat::Millis, true)),
                    ),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> RegistryError {
        let body = response.text().await.unwrap_or_default();
        RegistryError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[async_trait]
impl Registry for RestRegistry {
    fn backend(&self) -> &'static str {
        "postgrest"
    }

    async fn insert_job(&self, job: Job) -> RegistryResult<()> {
        self.insert("insert_job", JOBS, &job).await
    }

    async fn get_job(&self, id: &JobId) -> RegistryResult<Option<Job>> {
        let rows: Vec<Job> = self
            .select("get_job", JOBS, &[("id", format!("eq.{}", id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn latest_complete_job(&self, source_id: &str) -> RegistryResult<Option<Job>> {
        let rows: Vec<Job> = self
            .select(
                "latest_complete_job",
                JOBS,
                &[
                    ("source_id", format!("eq.{}", source_id)),
                    ("status", "eq.complete".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn resolve_job(&self, id: &JobId, resolution: JobResolution) -> RegistryResult<Job> {
        let current = self
            .get_job(id)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("job {}", id)))?;
        let current_status = current.status;
        let resolved = current.resolved(resolution)?;

        let rows: Vec<Job> = self
            .patch_processing("resolve_job", JOBS, id.as_str(), &resolved)
            .await?;

        match rows.into_iter().next() {
            Some(job) => Ok(job),
            None => {
                // Another writer resolved it between our read and the PATCH.
                debug!(job_id = %id, "Conditional job update matched no rows");
                let status = self
                    .get_job(id)
                    .await?
                    .map(|j| j.status.as_str())
                    .unwrap_or(current_status.as_str());
                Err(RegistryError::AlreadyResolved(
                    clipgen_models::TransitionError::AlreadyResolved {
                        kind: "job",
                        id: id.to_string(),
                        status,
                    },
                ))
            }
        }
    }

    async fn find_highlight(&self, highlight_id: &str) -> RegistryResult<Option<Highlight>> {
        let filter = serde_json::json!([{ "id": highlight_id }]).to_string();
        let rows: Vec<HighlightsRow> = self
            .select(
                "find_highlight",
                JOBS,
                &[
                    ("select", "highlights".to_string()),
                    ("highlights", format!("cs.{}", filter)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(rows
            .into_iter()
            .flat_map(|row| row.highlights.unwrap_or_default())
            .find(|h| h.id == highlight_id))
    }

    async fn insert_clip(&self, clip: Clip) -> RegistryResult<()> {
        self.insert("insert_clip", CLIPS, &clip).await
    }

    async fn get_clip(&self, id: &ClipId) -> RegistryResult<Option<Clip>> {
        let rows: Vec<Clip> = self
            .select("get_clip", CLIPS, &[("id", format!("eq.{}", id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn resolve_clip(&self, id: &ClipId, resolution: ClipResolution) -> RegistryResult<Clip> {
        let current = self
            .get_clip(id)
            .await?
            .ok_or_else(|| RegistryError::not_found(format!("clip {}", id)))?;
        let resolved = current.resolved(resolution)?;

        let rows: Vec<Clip> = self
            .patch_processing("resolve_clip", CLIPS, id.as_str(), &resolved)
            .await?;

        match rows.into_iter().next() {
            Some(clip) => Ok(clip),
            None => {
                debug!(clip_id = %id, "Conditional clip update matched no rows");
                let status = self
                    .get_clip(id)
                    .await?
                    .map(|c| c.status.as_str())
                    .unwrap_or("resolved");
                Err(RegistryError::AlreadyResolved(
                    clipgen_models::TransitionError::AlreadyResolved {
                        kind: "clip",
                        id: id.to_string(),
                        status,
                    },
                ))
            }
        }
    }

    async fn stale_jobs(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<JobId>> {
        let ids = self.stale_ids("stale_jobs", JOBS, cutoff).await?;
        Ok(ids.into_iter().map(JobId::from_string).collect())
    }

    async fn stale_clips(&self, cutoff: DateTime<Utc>) -> RegistryResult<Vec<ClipId>> {
        let ids = self.stale_ids("stale_clips", CLIPS, cutoff).await?;
        Ok(ids.into_iter().map(ClipId::from_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipgen_models::JobStatus;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registry(server: &MockServer) -> RestRegistry {
        RestRegistry::new(RestRegistryConfig {
            base_url: server.uri(),
            api_key: "service-key".to_string(),
            timeout: Duration::from_secs(5),
            retry: RetryConfig {
                max_retries: 1,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
        })
        .unwrap()
    }

    fn job_json(job: &Job) -> serde_json::Value {
        serde_json::to_value(job).unwrap()
    }

    #[tokio::test]
    async fn test_get_job_sends_auth_headers() {
        let server = MockServer::start().await;
        let job = Job::new("dQw4w9WgXcQ");

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("id", format!("eq.{}", job.id)))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![job_json(&job)]))
            .expect(1)
            .mount(&server)
            .await;

        let found = registry(&server).get_job(&job.id).await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_get_missing_job_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        assert!(registry(&server)
            .get_job(&JobId::from_string("nope"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_latest_complete_job_query() {
        let server = MockServer::start().await;
        let job = Job::new("dQw4w9WgXcQ")
            .resolved(JobResolution::Complete {
                highlights: vec![],
                video_title: None,
            })
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("source_id", "eq.dQw4w9WgXcQ"))
            .and(query_param("status", "eq.complete"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![job_json(&job)]))
            .mount(&server)
            .await;

        let cached = registry(&server)
            .latest_complete_job("dQw4w9WgXcQ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.id, job.id);
    }

    #[tokio::test]
    async fn test_resolve_job_conditional_patch() {
        let server = MockServer::start().await;
        let job = Job::new("dQw4w9WgXcQ");
        let done = job.clone().resolved(JobResolution::failed("boom")).unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![job_json(&job)]))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("id", format!("eq.{}", job.id)))
            .and(query_param("status", "eq.processing"))
            .and(header("prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![job_json(&done)]))
            .expect(1)
            .mount(&server)
            .await;

        let resolved = registry(&server)
            .resolve_job(&job.id, JobResolution::failed("boom"))
            .await
            .unwrap();
        assert_eq!(resolved.status, JobStatus::Error);
        assert_eq!(resolved.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_resolve_terminal_job_skips_patch() {
        let server = MockServer::start().await;
        let done = Job::new("dQw4w9WgXcQ")
            .resolved(JobResolution::failed("boom"))
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![job_json(&done)]))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = registry(&server)
            .resolve_job(&done.id, JobResolution::failed("again"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn test_resolve_clip_lost_race() {
        let server = MockServer::start().await;
        let clip = Clip::new("dQw4w9WgXcQ", 30, 60, None);

        Mock::given(method("GET"))
            .and(path("/rest/v1/clips"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(vec![serde_json::to_value(&clip).unwrap()]),
            )
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/clips"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let err = registry(&server)
            .resolve_clip(&clip.id, ClipResolution::ready("https://cdn/x.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyResolved(_)));
    }

    #[tokio::test]
    async fn test_find_highlight_uses_containment_filter() {
        let server = MockServer::start().await;
        let highlight = Highlight::new("dQw4w9WgXcQ", 30, 55, "Hook");

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("select", "highlights"))
            .and(query_param(
                "highlights",
                format!("cs.[{{\"id\":\"{}\"}}]", highlight.id),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "highlights": [highlight] }
            ])))
            .mount(&server)
            .await;

        let found = registry(&server)
            .find_highlight(&highlight.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.end_timestamp, 55);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clips"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(2)
            .mount(&server)
            .await;

        let err = registry(&server)
            .get_clip(&ClipId::from_string("c1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ServerError(503, _)));
    }

    #[tokio::test]
    async fn test_insert_failure_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/jobs"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad column"))
            .expect(1)
            .mount(&server)
            .await;

        let err = registry(&server)
            .insert_job(Job::new("dQw4w9WgXcQ"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_stale_jobs_query() {
        let server = MockServer::start().await;
        let cutoff = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();

        Mock::given(method("GET"))
            .and(path("/rest/v1/jobs"))
            .and(query_param("select", "id"))
            .and(query_param("status", "eq.processing"))
            .and(query_param("created_at", "lt.2026-01-01T00:00:00.000Z"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"id": "j1"}, {"id": "j2"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ids = registry(&server).stale_jobs(cutoff).await.unwrap();
        assert_eq!(ids, vec![JobId::from_string("j1"), JobId::from_string("j2")]);
    }
}
