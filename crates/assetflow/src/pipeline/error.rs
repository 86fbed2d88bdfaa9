use thiserror::Error;

use crate::disposition::DispositionError;
use crate::error::{StorageError, TransferError};
use crate::input::ResolveError;
use crate::provenance::PersistenceError;
use crate::status::{STATE_ERROR, STATE_FORBIDDEN, STATE_OK};

/// Why a run ended in `RunState::Error`. The `Display` output is the
/// message handed back to the task queue.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Error, no input file")]
    MissingInput,

    #[error("Input & output dirs not ok")]
    DataDirs(#[source] StorageError),

    #[error("{0}")]
    InvalidReference(#[source] ResolveError),

    #[error("{context}: {source}")]
    Transfer {
        context: &'static str,
        #[source]
        source: TransferError,
    },

    #[error("Applied model, but {missing} must be set to transfer output")]
    Configuration { missing: String },

    /// The processing step's own state and message, unchanged.
    #[error("{message}")]
    Processing { state: u16, message: String },

    #[error("Failed to persist provenance: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Failed to prepare asset directories: {0}")]
    Staging(#[source] StorageError),

    #[error("Applied model, but could not delete the input file: {0}")]
    InputCleanup(#[source] StorageError),
}

impl PipelineError {
    pub fn state(&self) -> u16 {
        match self {
            PipelineError::MissingInput => STATE_FORBIDDEN,
            PipelineError::Processing { state, .. } if *state != STATE_OK => *state,
            _ => STATE_ERROR,
        }
    }

    /// Whether re-dispatching the same job could succeed without an
    /// operator changing configuration or input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Transfer { .. } | PipelineError::Processing { .. }
        )
    }

    /// True once the model has been applied, i.e. the failure happened
    /// during transfer or cleanup.
    pub fn after_processing(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration { .. }
                | PipelineError::InputCleanup(_)
                | PipelineError::Transfer {
                    context: UPLOAD_CONTEXT,
                    ..
                }
        )
    }
}

pub(crate) const DOWNLOAD_CONTEXT: &str = "Failed to download input";
pub(crate) const UPLOAD_CONTEXT: &str = "Applied model, but failed to transfer output to S3";

impl From<ResolveError> for PipelineError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Transfer(source) => PipelineError::Transfer {
                context: DOWNLOAD_CONTEXT,
                source,
            },
            ResolveError::Staging(source) => PipelineError::Staging(source),
            invalid => PipelineError::InvalidReference(invalid),
        }
    }
}

impl From<DispositionError> for PipelineError {
    fn from(e: DispositionError) -> Self {
        match e {
            DispositionError::Configuration { missing } => {
                PipelineError::Configuration { missing }
            }
            DispositionError::Transfer(source) => PipelineError::Transfer {
                context: UPLOAD_CONTEXT,
                source,
            },
            DispositionError::InputCleanup(source) => PipelineError::InputCleanup(source),
        }
    }
}

/// Something that went wrong without failing the run.
#[derive(Debug, Clone)]
pub enum PipelineWarning {
    Cleanup { path: String, error: String },
}

impl From<&StorageError> for PipelineWarning {
    fn from(e: &StorageError) -> Self {
        let path = match e {
            StorageError::CreateDirectory { path, .. }
            | StorageError::ReadFile { path, .. }
            | StorageError::WriteFile { path, .. }
            | StorageError::RemoveFile { path, .. }
            | StorageError::RemoveDirectory { path, .. }
            | StorageError::Archive { path, .. }
            | StorageError::RefusedDeletion { path, .. }
            | StorageError::MissingBaseMount(path) => path,
        };
        PipelineWarning::Cleanup {
            path: path.display().to_string(),
            error: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn io_error() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn test_missing_input_is_forbidden() {
        let err = PipelineError::MissingInput;
        assert_eq!(err.state(), 403);
        assert_eq!(err.to_string(), "Error, no input file");
    }

    #[test]
    fn test_processing_message_is_unchanged() {
        let err = PipelineError::Processing {
            state: 500,
            message: "Failed to apply model: boom".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to apply model: boom");
        assert_eq!(err.state(), 500);
        assert!(err.is_retryable());
        assert!(!err.after_processing());
    }

    #[test]
    fn test_upload_and_download_failures_are_told_apart() {
        let download: PipelineError = ResolveError::Transfer(TransferError::Runtime(io_error())).into();
        let upload: PipelineError =
            DispositionError::Transfer(TransferError::Runtime(io_error())).into();

        assert!(download.to_string().starts_with("Failed to download input"));
        assert!(upload.to_string().starts_with("Applied model, but"));
        assert!(!download.after_processing());
        assert!(upload.after_processing());
        assert!(download.is_retryable() && upload.is_retryable());
    }

    #[test]
    fn test_configuration_error() {
        let err: PipelineError = DispositionError::Configuration {
            missing: "s3_bucket".to_string(),
        }
        .into();
        assert_eq!(err.state(), 500);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("s3_bucket"));
    }

    #[test]
    fn test_invalid_reference_keeps_resolver_message() {
        let resolve = ResolveError::InvalidReference {
            reference: "gs://bucket/x".to_string(),
            reason: "bad scheme".to_string(),
        };
        let expected = resolve.to_string();
        let err: PipelineError = resolve.into();
        assert!(matches!(err, PipelineError::InvalidReference(_)));
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_warning_from_storage_error() {
        let warning = PipelineWarning::from(&StorageError::RemoveDirectory {
            path: PathBuf::from("/data/input-files/a__b"),
            source: io_error(),
        });
        let PipelineWarning::Cleanup { path, error } = warning;
        assert_eq!(path, "/data/input-files/a__b");
        assert!(error.contains("denied"));
    }
}
