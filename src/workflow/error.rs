//! Workflow engine error types.

use std::path::PathBuf;

use thiserror::Error;

use super::interpolate::InterpolationError;

/// Result type for workflow engine operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors that abort a workflow command.
///
/// Recoverable conditions (corrupt markers, interpolation gaps) are not
/// represented here; they surface as warnings on the returned reports.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Change-request document does not exist.
    #[error("Change-request document not found: {0}")]
    DocumentNotFound(PathBuf),

    /// Change-request document exists but cannot be read.
    #[error("Change-request document unreadable: {path}: {source}")]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step artifact could not be written.
    #[error("Failed to write artifact for step '{step}' to {path}: {source}")]
    WriteFailed {
        step: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Progress marker could not be persisted.
    #[error("Failed to update progress marker {path}: {source}")]
    MarkerWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step identifier is not part of the catalogue.
    #[error("Unknown workflow step: '{0}'")]
    UnknownStep(String),

    /// Step index outside of the catalogue range.
    #[error("Step index {index} is out of range (expected 0..={max})")]
    InvalidStepIndex { index: usize, max: usize },

    /// A catalogue entry carries a broken prompt template.
    #[error("Invalid prompt template for step '{step}': {source}")]
    InvalidCatalogue {
        step: String,
        #[source]
        source: InterpolationError,
    },
}

impl WorkflowError {
    /// Whether the error points at a defect in the step definitions rather
    /// than at the user's document or file system.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::InvalidCatalogue { .. } | Self::UnknownStep(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failed_message_names_step_and_path() {
        let err = WorkflowError::WriteFailed {
            step: "01-laying-the-foundation".to_string(),
            path: PathBuf::from("docs/x.01-laying-the-foundation.md"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let message = err.to_string();
        assert!(message.contains("01-laying-the-foundation"));
        assert!(message.contains("docs/x.01-laying-the-foundation.md"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_configuration_error_classification() {
        assert!(WorkflowError::UnknownStep("nope".to_string()).is_configuration_error());
        assert!(!WorkflowError::DocumentNotFound(PathBuf::from("x.md")).is_configuration_error());
    }
}
