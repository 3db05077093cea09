//! Client for the remote workflow engine.
//!
//! The engine is an opaque HTTP service. Work is handed to it over one
//! webhook per operation and it reports back through the callback URL carried
//! in each payload. A short liveness probe decides whether it is used at all.

pub mod client;
pub mod error;
pub mod types;

pub use client::{WorkflowClient, WorkflowConfig};
pub use error::{WorkflowError, WorkflowResult};
pub use types::{AnalysisWebhook, ClipWebhook};
