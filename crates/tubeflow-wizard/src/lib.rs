//! Headless upload wizard.
//!
//! This crate provides:
//! - `UploadState` and its lock-protected `UploadStore`
//! - `UploadWizard`, the step handlers driving a `BackendGateway`
//! - Per-operation loading flags and per-field errors
//! - Scoped blob URLs for custom thumbnails
//! - Section view models for rendering each step
//! - `CredentialsPanel` for the settings page

pub mod blob;
pub mod error;
pub mod field;
pub mod logging;
pub mod sections;
pub mod settings;
pub mod state;
pub mod store;
pub mod wizard;

pub use blob::{BlobLease, BlobRegistry};
pub use error::{SaveOutcome, WizardError, WizardResult};
pub use field::{Field, FieldErrors, LoadingFlags, Operation};
pub use logging::WizardLogger;
pub use sections::{
    DescriptionSection, PreviewSection, SectionView, ThumbnailOption, ThumbnailSection,
    TimestampsSection, TitleSection, UploadSection,
};
pub use settings::{CredentialsPanel, CredentialsState, TokenStatus};
pub use state::{UploadState, UploadStatePatch};
pub use store::{InFlight, UploadStore};
pub use wizard::UploadWizard;
