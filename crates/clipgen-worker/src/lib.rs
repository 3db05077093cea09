//! Analysis and clip orchestration.
//!
//! This crate provides:
//! - Transcript normalization and bounded sampling
//! - Concurrent caption and metadata gathering
//! - Analysis providers (workflow engine, hosted LLM, fixture)
//! - Clip renderers (workflow engine, local yt-dlp + FFmpeg)
//! - Supervised background tasks
//! - A sweep that fails records the workflow engine never completed
//! - The `Orchestrator` driving jobs and clips to a terminal state

pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod provider;
pub mod render;
pub mod sources;
pub mod stale;
pub mod transcript;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{spawn_supervised, TrackedRecord, INTERNAL_ERROR_MESSAGE};
pub use llm::{LlmConfig, OpenRouterClient};
pub use orchestrator::{AnalyzeOutcome, ClipArtifact, Orchestrator};
pub use provider::{AnalysisProvider, FixtureProvider, LlmProvider, ProviderOutcome, RemoteEngineProvider};
pub use render::{ClipRenderer, LocalClipRenderer, RemoteClipRenderer, RenderOutcome};
pub use sources::{AnalysisInput, InputGatherer};
pub use stale::{StaleRecordSweeper, SweepReport};
pub use transcript::{normalize_vtt, NormalizedTranscript};
