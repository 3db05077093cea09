//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use clipgen_models::JobId;
use serde::Serialize;

use crate::state::AppState;

/// Service banner.
#[derive(Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "ClipGenius API is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub registry: CheckStatus,
    pub storage: CheckStatus,
    /// Informational; an unreachable engine only moves work to local providers
    pub workflow: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(backend: &str, started: Instant) -> Self {
        Self {
            status: "ok".to_string(),
            backend: Some(backend.to_string()),
            error: None,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }

    fn error(backend: &str, msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            backend: Some(backend.to_string()),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn skipped(backend: &str) -> Self {
        Self {
            status: "skipped".to_string(),
            backend: Some(backend.to_string()),
            error: None,
            latency_ms: None,
        }
    }

    fn is_healthy(&self) -> bool {
        self.status != "error"
    }
}

/// Readiness check endpoint (readiness probe).
/// Checks the registry and, when configured, R2 and the workflow engine.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let registry = state.orchestrator.registry();

    // A lookup of a random id exercises the full read path
    let registry_check = {
        let start = Instant::now();
        match registry.get_job(&JobId::new()).await {
            Ok(_) => CheckStatus::ok(registry.backend(), start),
            Err(e) => CheckStatus::error(registry.backend(), e.to_string()),
        }
    };

    let storage_check = match &state.r2 {
        Some(r2) => {
            let start = Instant::now();
            match r2.check_connectivity().await {
                Ok(_) => CheckStatus::ok("r2", start),
                Err(e) => CheckStatus::error("r2", e.to_string()),
            }
        }
        None => CheckStatus::skipped("local"),
    };

    let workflow_check = match &state.workflow {
        Some(client) => {
            let start = Instant::now();
            match client.health_check().await {
                Ok(true) => CheckStatus::ok("workflow", start),
                Ok(false) => CheckStatus {
                    status: "unavailable".to_string(),
                    ..CheckStatus::skipped("workflow")
                },
                Err(e) => CheckStatus {
                    status: "unavailable".to_string(),
                    error: Some(e.to_string()),
                    ..CheckStatus::skipped("workflow")
                },
            }
        }
        None => CheckStatus::skipped("none"),
    };

    let all_ok = registry_check.is_healthy() && storage_check.is_healthy();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            registry: registry_check,
            storage: storage_check,
            workflow: workflow_check,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
