//! Application state.

use std::sync::Arc;

use clipgen_registry::{InMemoryRegistry, Registry, RestRegistry, RestRegistryConfig};
use clipgen_storage::{ArtifactStore, LocalArtifactStore, R2ArtifactStore, R2Client, R2Config};
use clipgen_worker::{
    AnalysisProvider, ClipRenderer, FixtureProvider, LlmConfig, LlmProvider, LocalClipRenderer,
    OpenRouterClient, Orchestrator, RemoteClipRenderer, RemoteEngineProvider, WorkerConfig,
};
use clipgen_workflow::{WorkflowClient, WorkflowConfig};
use tracing::{info, warn};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Orchestrator,
    /// Present when clips are published to R2
    pub r2: Option<Arc<R2Client>>,
    /// Present when a workflow engine is configured
    pub workflow: Option<WorkflowClient>,
}

impl AppState {
    /// State around an existing orchestrator, with no optional backends.
    pub fn new(config: ApiConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            orchestrator,
            r2: None,
            workflow: None,
        }
    }

    /// Build the full state from environment variables.
    ///
    /// Each optional backend (REST registry, R2, workflow engine, LLM key)
    /// falls back to its local counterpart when unconfigured.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let worker_config = WorkerConfig::from_env();

        let registry: Arc<dyn Registry> = match RestRegistryConfig::from_env() {
            Some(registry_config) => {
                info!(url = %registry_config.base_url, "Using REST registry");
                Arc::new(RestRegistry::new(registry_config)?)
            }
            None => {
                info!("REGISTRY_URL not set, using in-memory registry");
                Arc::new(InMemoryRegistry::new())
            }
        };

        let local_store =
            LocalArtifactStore::new(&worker_config.output_dir, &worker_config.public_base_url);

        let r2 = match R2Config::from_env()? {
            Some(r2_config) => {
                info!(bucket = %r2_config.bucket_name, "Publishing clips to R2");
                Some(Arc::new(R2Client::new(r2_config)))
            }
            None => {
                info!("R2 not configured, serving clips locally");
                None
            }
        };

        let artifact_store: Arc<dyn ArtifactStore> = match &r2 {
            Some(client) => Arc::new(R2ArtifactStore::new(client.as_ref().clone())),
            None => Arc::new(local_store.clone()),
        };

        let workflow = match WorkflowConfig::from_env() {
            Some(workflow_config) => {
                info!(url = %workflow_config.base_url, "Workflow engine configured");
                Some(WorkflowClient::new(workflow_config)?)
            }
            None => None,
        };

        let mut providers: Vec<Arc<dyn AnalysisProvider>> = Vec::new();
        let mut renderers: Vec<Arc<dyn ClipRenderer>> = Vec::new();

        if let Some(client) = &workflow {
            providers.push(Arc::new(RemoteEngineProvider::new(
                client.clone(),
                worker_config.analysis_callback_url(),
            )));
            renderers.push(Arc::new(RemoteClipRenderer::new(
                client.clone(),
                worker_config.clip_callback_url(),
            )));
        }

        match LlmConfig::from_env() {
            Some(llm_config) => {
                let client = OpenRouterClient::new(llm_config)?;
                info!(model = %client.model(), "Hosted LLM analysis enabled");
                providers.push(Arc::new(LlmProvider::new(client)));
            }
            None => warn!("OPENROUTER_API_KEY not set, local analysis uses fixture highlights"),
        }
        providers.push(Arc::new(FixtureProvider));

        renderers.push(Arc::new(LocalClipRenderer::from_config(
            &worker_config,
            artifact_store,
        )));

        let orchestrator = Orchestrator::with_config(registry, providers, renderers, &worker_config)
            .with_local_store(local_store);

        info!(
            registry = orchestrator.registry().backend(),
            providers = ?orchestrator.provider_names(),
            renderers = ?orchestrator.renderer_names(),
            "Orchestrator ready"
        );

        Ok(Self {
            config,
            orchestrator,
            r2,
            workflow,
        })
    }
}
