//! Retry for idempotent reads.
//!
//! Only `GET` requests come through here; mutations are sent once. A read is
//! repeated on network errors, 429 and 5xx, and a server-provided
//! `Retry-After` takes precedence over the computed backoff.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::GatewayResult;
use crate::metrics::record_retry;

/// How often and how patiently a read is repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRetryPolicy {
    /// Total tries, the first one included. `1` means no retries.
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReadRetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl ReadRetryPolicy {
    /// Backoff bounds from `TUBEFLOW_RETRY_BASE_MS` / `TUBEFLOW_RETRY_MAX_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let initial_backoff = env_millis("TUBEFLOW_RETRY_BASE_MS").unwrap_or(defaults.initial_backoff);
        let max_backoff = env_millis("TUBEFLOW_RETRY_MAX_MS").unwrap_or(defaults.max_backoff);

        Self {
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
            ..defaults
        }
    }

    /// Wait before retry number `retry` (0-based): doubled per retry,
    /// capped, then spread by +/-25%.
    fn backoff(&self, retry: u32, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint.min(self.max_backoff);
        }

        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let capped = self.initial_backoff.saturating_mul(factor).min(self.max_backoff);
        let spread = rand::thread_rng().gen_range(0.75..=1.25);
        capped.mul_f64(spread).min(self.max_backoff)
    }

    /// Run `read` until it succeeds, fails with a non-retryable error, or
    /// the attempts are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, operation: &str, read: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut tries = 1;
        loop {
            match read().await {
                Err(e) if e.is_retryable() && tries < self.attempts => {
                    let hint = e.retry_after_ms().map(Duration::from_millis);
                    let delay = self.backoff(tries - 1, hint);
                    warn!(
                        operation = %operation,
                        attempt = tries,
                        delay_ms = delay.as_millis() as u64,
                        "Read failed, retrying: {}",
                        e
                    );
                    record_retry(operation);
                    tokio::time::sleep(delay).await;
                    tries += 1;
                }
                result => return result,
            }
        }
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(attempts: u32) -> ReadRetryPolicy {
        ReadRetryPolicy {
            attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_backoff_stays_within_bounds() {
        let policy = ReadRetryPolicy::default();
        for retry in 0..40 {
            let delay = policy.backoff(retry, None);
            assert!(delay >= policy.initial_backoff.mul_f64(0.75));
            assert!(delay <= policy.max_backoff);
        }
    }

    #[test]
    fn test_backoff_prefers_server_hint() {
        let policy = ReadRetryPolicy::default();
        assert_eq!(
            policy.backoff(0, Some(Duration::from_millis(1500))),
            Duration::from_millis(1500)
        );
        assert_eq!(
            policy.backoff(0, Some(Duration::from_secs(60))),
            policy.max_backoff
        );
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = quick(4)
            .run("list_videos", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GatewayError::from_http_status(503, "busy"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: GatewayResult<()> = quick(4)
            .run("get_key", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::unauthorized("expired"))
            })
            .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_cap_total_tries() {
        for (attempts, expected) in [(4, 4), (1, 1)] {
            let counter = AtomicU32::new(0);
            let calls = &counter;
            let result: GatewayResult<()> = quick(attempts)
                .run("list_playlists", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::from_http_status(500, "boom"))
                })
                .await;

            assert!(matches!(result, Err(GatewayError::ServerError(500, _))));
            assert_eq!(counter.load(Ordering::SeqCst), expected);
        }
    }
}
