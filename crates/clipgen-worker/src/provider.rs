//! Analysis providers.
//!
//! The orchestrator walks an ordered list of providers and uses the first one
//! that reports itself available: the remote workflow engine when its
//! liveness probe answers, then the hosted LLM when a key is configured, then
//! the fixture provider.

use async_trait::async_trait;
use clipgen_models::{HighlightDraft, Job};
use clipgen_workflow::{AnalysisWebhook, WorkflowClient};
use tracing::info;

use crate::error::WorkerResult;
use crate::llm::OpenRouterClient;
use crate::sources::AnalysisInput;

/// What a provider did with a job.
#[derive(Debug, Clone)]
pub enum ProviderOutcome {
    /// Highlights found locally; the caller resolves the job
    Highlights(Vec<HighlightDraft>),
    /// Handed off; the job is resolved later by callback
    Dispatched,
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the provider reads the transcript. When false the caption
    /// fetch and metadata probe are skipped.
    fn needs_transcript(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn analyze(&self, job: &Job, input: &AnalysisInput) -> WorkerResult<ProviderOutcome>;
}

/// Delegates analysis to the workflow engine.
pub struct RemoteEngineProvider {
    client: WorkflowClient,
    callback_url: String,
}

impl RemoteEngineProvider {
    pub fn new(client: WorkflowClient, callback_url: impl Into<String>) -> Self {
        Self {
            client,
            callback_url: callback_url.into(),
        }
    }
}

#[async_trait]
impl AnalysisProvider for RemoteEngineProvider {
    fn name(&self) -> &'static str {
        "workflow"
    }

    async fn is_available(&self) -> bool {
        self.client.health_check().await.unwrap_or(false)
    }

    async fn analyze(&self, job: &Job, input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
        let payload = AnalysisWebhook {
            job_id: job.id.to_string(),
            video_id: job.source_id.clone(),
            video_url: job.source_url.clone(),
            video_title: input.title.clone().unwrap_or_else(|| job.video_title.clone()),
            transcript: input.transcript.clone(),
            duration: input.duration,
            callback_url: self.callback_url.clone(),
        };
        self.client.dispatch_analysis(&payload).await?;
        info!(job_id = %job.id, "Analysis handed to workflow engine");
        Ok(ProviderOutcome::Dispatched)
    }
}

/// Finds highlights with a hosted LLM.
pub struct LlmProvider {
    client: OpenRouterClient,
}

impl LlmProvider {
    pub fn new(client: OpenRouterClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisProvider for LlmProvider {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn analyze(&self, _job: &Job, input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
        let drafts = self.client.find_highlights(input).await?;
        Ok(ProviderOutcome::Highlights(drafts))
    }
}

/// Fixed highlights for running without any analysis backend.
#[derive(Debug, Default, Clone)]
pub struct FixtureProvider;

impl FixtureProvider {
    pub fn drafts() -> Vec<HighlightDraft> {
        vec![
            HighlightDraft::new(30.0, 55.0, "Strong opening hook that sets up the rest of the video"),
            HighlightDraft::new(75.0, 100.0, "Key point explained with a memorable example"),
            HighlightDraft::new(140.0, 170.0, "Surprising turn that changes the direction of the story"),
            HighlightDraft::new(210.0, 240.0, "Memorable closing line worth sharing on its own"),
        ]
    }
}

#[async_trait]
impl AnalysisProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn needs_transcript(&self) -> bool {
        false
    }

    async fn analyze(&self, _job: &Job, _input: &AnalysisInput) -> WorkerResult<ProviderOutcome> {
        Ok(ProviderOutcome::Highlights(Self::drafts()))
    }
}
