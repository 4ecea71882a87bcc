//! Structured logging for wizard operations.

use tracing::{error, info, warn, Span};

use tubeflow_models::VideoId;

use crate::field::Operation;

/// Logger carrying the video id and operation for one handler call.
#[derive(Debug, Clone)]
pub struct WizardLogger {
    video_id: String,
    operation: Operation,
}

impl WizardLogger {
    pub fn new(video_id: &VideoId, operation: Operation) -> Self {
        Self {
            video_id: video_id.to_string(),
            operation,
        }
    }

    /// Logger for operations that run before a video id exists.
    pub fn pending(operation: Operation) -> Self {
        Self {
            video_id: String::new(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Wizard step started: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            video_id = %self.video_id,
            operation = %self.operation,
            field = %self.operation.field(),
            "Wizard step warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            video_id = %self.video_id,
            operation = %self.operation,
            field = %self.operation.field(),
            "Wizard step failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            video_id = %self.video_id,
            operation = %self.operation,
            "Wizard step completed: {}", message
        );
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Span wrapping the backend call of one handler.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "wizard",
            video_id = %self.video_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_context() {
        let logger = WizardLogger::new(&VideoId::from("v1"), Operation::SaveTitle);
        assert_eq!(logger.video_id(), "v1");
        assert_eq!(logger.operation(), Operation::SaveTitle);

        let pending = WizardLogger::pending(Operation::Upload);
        assert!(pending.video_id().is_empty());
    }
}
