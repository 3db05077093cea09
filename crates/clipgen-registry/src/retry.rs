//! Retry with exponential backoff and jitter for row-store reads.

use std::time::{Duration, SystemTime};

use tracing::{info_span, warn, Instrument};

use crate::error::{RegistryError, RegistryResult};
use crate::metrics::record_retry;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay cap (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_or("REGISTRY_MAX_RETRIES", defaults.max_retries),
            base_delay_ms: env_or("REGISTRY_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_or("REGISTRY_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Execute an async operation, retrying network errors, 429 and 5xx.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: &str, op: F) -> RegistryResult<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = RegistryResult<T>>,
{
    let mut attempt = 0;
    loop {
        let span = info_span!("registry_retry", operation = %operation, attempt = attempt + 1);
        match op().instrument(span).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = calculate_delay(config, attempt, e.retry_after_ms());
                warn!(
                    operation = %operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Registry request failed, retrying: {}",
                    e
                );
                record_retry(operation);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Exponential backoff with full jitter, floored at the base delay.
fn calculate_delay(config: &RetryConfig, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    if let Some(after) = retry_after_ms {
        return Duration::from_millis(after.min(config.max_delay_ms));
    }

    let capped = config
        .base_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(config.max_delay_ms);

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let jittered = (capped as f64 * (nanos % 1000) as f64 / 1000.0) as u64;

    Duration::from_millis(jittered.max(config.base_delay_ms))
}
