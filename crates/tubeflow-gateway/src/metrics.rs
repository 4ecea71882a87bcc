//! Gateway metrics collection.
//!
//! Request counters, latency histograms and retry counters per backend
//! operation. Nothing is exported unless the host installs a recorder.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total gateway requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "gateway_requests_total";

    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "gateway_retries_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "gateway_latency_seconds";

    /// Responses that forced a logout.
    pub const UNAUTHORIZED_TOTAL: &str = "gateway_unauthorized_total";
}

/// Record metrics for a completed gateway request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a 401 that triggered the logout hook.
pub fn record_unauthorized(operation: &str) {
    counter!(
        names::UNAUTHORIZED_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}
