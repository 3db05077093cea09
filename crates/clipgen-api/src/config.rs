//! API configuration.

use std::str::FromStr;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_RATE_LIMIT_RPS: u32 = 10;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
    /// Per client IP, applied to `/api` except callbacks
    pub rate_limit_rps: u32,
    pub max_body_size: usize,
    /// `production` hides internal error details
    pub environment: String,
    /// Shared secret the workflow engine sends in `X-Callback-Secret`
    pub callback_secret: Option<String>,
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: DEFAULT_RATE_LIMIT_RPS,
            max_body_size: DEFAULT_MAX_BODY_BYTES,
            environment: "development".to_string(),
            callback_secret: None,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Read overrides from the environment; unset or unparsable values keep
    /// their defaults. `API_PORT` wins over the platform-provided `PORT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = env_string("CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.cors_origins);

        Self {
            host: env_string("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT")
                .or_else(|| env_parse("PORT"))
                .unwrap_or(defaults.port),
            cors_origins,
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: env_string("ENVIRONMENT").unwrap_or(defaults.environment),
            callback_secret: env_string("CALLBACK_SECRET"),
            metrics_enabled: env_string("METRICS_ENABLED")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.trim().parse().ok())
}
