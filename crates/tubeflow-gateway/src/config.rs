//! Gateway configuration.

use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::retry::ReadRetryPolicy;

/// Default backend address for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Backend gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Backend base URL, without trailing slash
    pub base_url: String,
    /// Whole-request timeout. `None` keeps the HTTP client default.
    pub timeout: Option<Duration>,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry policy for idempotent reads
    pub retry: ReadRetryPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            retry: ReadRetryPolicy::default(),
        }
    }
}

impl GatewayConfig {
    /// Config pointing at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Default::default()
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> GatewayResult<Self> {
        let base_url =
            std::env::var("TUBEFLOW_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let base_url = normalize_base_url(&base_url);

        if base_url.is_empty() {
            return Err(GatewayError::config("TUBEFLOW_API_URL cannot be empty"));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(GatewayError::config(format!(
                "TUBEFLOW_API_URL must be an http(s) URL, got {}",
                base_url
            )));
        }

        let timeout = std::env::var("TUBEFLOW_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let connect_timeout_secs: u64 = std::env::var("TUBEFLOW_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Ok(Self {
            base_url,
            timeout,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: ReadRetryPolicy::from_env(),
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
