//! Shared data models for the Tubeflow upload wizard.
//!
//! This crate provides Serde-serializable types for:
//! - Backend video records and their identifiers
//! - Wizard steps and the content accumulated across them
//! - Publish settings (privacy, scheduling)
//! - Credential records (AI provider key preview, YouTube tokens)
//! - Playlists and source URLs

pub mod content;
pub mod credentials;
pub mod playlist;
pub mod publish;
pub mod source;
pub mod step;
pub mod video;

// Re-export common types
pub use content::WizardContent;
pub use credentials::{ApiKeyPreview, AuthorizationUrl, TokenRecord};
pub use playlist::Playlist;
pub use publish::{Privacy, PublishRequest, PublishType};
pub use source::{SourceUrl, SourceUrlError};
pub use step::WizardStep;
pub use video::{UploadedFile, UploadedVideo, VideoId, VideoSummary};
