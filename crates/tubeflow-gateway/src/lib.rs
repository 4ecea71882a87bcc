//! Typed HTTP client for the Tubeflow backend API.
//!
//! This crate provides:
//! - The `BackendGateway` trait the wizard is written against
//! - `HttpGateway`, its reqwest implementation
//! - An injected `Session` holding the bearer credential, with uniform
//!   logout handling on 401 responses
//! - Retry with backoff for idempotent reads, and request metrics

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod retry;
pub mod session;

pub use client::HttpGateway;
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{BackendGateway, ProgressFn, ThumbnailUpload, UploadSource, THUMBNAIL_BATCH_SIZE};
pub use retry::ReadRetryPolicy;
pub use session::{LogOnlyHandler, Session, UnauthorizedHandler};

#[cfg(any(test, feature = "mocks"))]
pub use gateway::MockBackendGateway;
