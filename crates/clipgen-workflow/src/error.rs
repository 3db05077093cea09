//! Workflow client error types.

use thiserror::Error;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow engine unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Webhook rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowError {
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::ServiceUnavailable(_) | WorkflowError::Network(_) => true,
            WorkflowError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
