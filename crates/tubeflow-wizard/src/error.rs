//! Wizard error types.

use thiserror::Error;
use tubeflow_gateway::GatewayError;
use tubeflow_models::{SourceUrlError, VideoId, WizardStep};

use crate::field::{Field, Operation};

pub type WizardResult<T> = Result<T, WizardError>;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Cannot continue before the upload completes")]
    MissingVideo,

    #[error("Nothing to save for {0}")]
    EmptyValue(Field),

    #[error("{0} is already in progress")]
    Busy(Operation),

    #[error("Step {requested} is not reachable from {current}")]
    StepLocked {
        current: WizardStep,
        requested: WizardStep,
    },

    #[error("{action} is only available on the {expected} step (currently {current})")]
    WrongStep {
        action: &'static str,
        expected: WizardStep,
        current: WizardStep,
    },

    #[error("Nothing to save on the {0} step")]
    NoSaveOnStep(WizardStep),

    #[error("Video {0} is already uploaded")]
    AlreadyUploaded(VideoId),

    #[error("Scheduled publish time must be in the future")]
    InvalidSchedule,

    #[error("Invalid source URL: {0}")]
    InvalidUrl(#[from] SourceUrlError),

    #[error("Unknown playlist: {0}")]
    UnknownPlaylist(String),

    #[error("Wizard was closed")]
    Closed,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WizardError {
    /// True for errors that mean the user must sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, WizardError::Gateway(e) if e.is_unauthorized())
    }

    /// Whether this error should be recorded against a field.
    ///
    /// Busy and closed states are transient and never shown inline.
    pub(crate) fn is_reportable(&self) -> bool {
        !matches!(self, WizardError::Busy(_) | WizardError::Closed)
    }
}

/// Result of a save handler.
///
/// The step only advances on [`SaveOutcome::Saved`].
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Failed(WizardError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }

    pub fn error(&self) -> Option<&WizardError> {
        match self {
            SaveOutcome::Saved => None,
            SaveOutcome::Failed(e) => Some(e),
        }
    }

    pub fn into_result(self) -> WizardResult<()> {
        match self {
            SaveOutcome::Saved => Ok(()),
            SaveOutcome::Failed(e) => Err(e),
        }
    }
}

impl From<WizardResult<()>> for SaveOutcome {
    fn from(result: WizardResult<()>) -> Self {
        match result {
            Ok(()) => SaveOutcome::Saved,
            Err(e) => SaveOutcome::Failed(e),
        }
    }
}
