//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success
//! - `1`: General error - unspecified failure
//! - `2`: Blocking error - registry contents cannot be trusted
//! - `3-125`: Specific recoverable errors
//! - `126-255`: Reserved by shell

use crate::error::SegmentError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// Corrupted or mismatched registry artifacts (code 2)
    BlockingError = 2,

    /// No trained model or unknown version (code 3)
    NotFound = 3,

    /// Input records or arguments cannot be used (code 4)
    InvalidInput = 4,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Another training run holds the registry (code 7)
    Busy = 7,

    /// Training produced a degenerate partition (code 8)
    Degenerate = 8,

    /// Training was cancelled (code 9)
    Cancelled = 9,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl ExitCode {
    /// Convert a `SegmentError` to the appropriate exit code.
    ///
    /// Maps specific error types to semantic exit codes that schedulers
    /// can use to decide whether to retry, retrain or alert.
    pub fn from_error(error: &SegmentError) -> Self {
        match error {
            SegmentError::ModelNotTrained { .. } | SegmentError::VersionNotFound { .. } => {
                ExitCode::NotFound
            }

            SegmentError::RegistryCorrupted { .. } | SegmentError::ArtifactMismatch { .. } => {
                ExitCode::BlockingError
            }

            SegmentError::SchemaMismatch { .. }
            | SegmentError::InvalidRecord { .. }
            | SegmentError::InsufficientData { .. }
            | SegmentError::InvalidClusterCount { .. }
            | SegmentError::DimensionMismatch { .. }
            | SegmentError::ForeignLabel { .. }
            | SegmentError::Serialization(_) => ExitCode::InvalidInput,

            SegmentError::Io { .. } => ExitCode::IoError,
            SegmentError::Config { .. } => ExitCode::ConfigError,
            SegmentError::ConcurrentTraining { .. } => ExitCode::Busy,
            SegmentError::DegenerateClustering { .. } => ExitCode::Degenerate,
            SegmentError::Cancelled { .. } => ExitCode::Cancelled,
        }
    }

    /// Check if this exit code indicates a blocking error.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, ExitCode::BlockingError)
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Whether rerunning the same command later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExitCode::Busy | ExitCode::Cancelled)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::BlockingError => "Blocking error - registry needs attention",
            ExitCode::NotFound => "Model not found",
            ExitCode::InvalidInput => "Invalid input",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::Busy => "Training already in progress",
            ExitCode::Degenerate => "Degenerate clustering",
            ExitCode::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success as u8, 0);
        assert_eq!(ExitCode::GeneralError as u8, 1);
        assert_eq!(ExitCode::BlockingError as u8, 2);
        assert_eq!(ExitCode::NotFound as u8, 3);
        assert_eq!(i32::from(ExitCode::Cancelled), 9);
    }

    #[test]
    fn test_from_error() {
        let not_trained = SegmentError::ModelNotTrained {
            path: PathBuf::from("models"),
        };
        assert_eq!(ExitCode::from_error(&not_trained), ExitCode::NotFound);

        let mismatch = SegmentError::SchemaMismatch {
            candidate_id: "c1".to_string(),
            field: "location".to_string(),
        };
        assert_eq!(ExitCode::from_error(&mismatch), ExitCode::InvalidInput);

        let busy = SegmentError::ConcurrentTraining {
            path: PathBuf::from("models"),
        };
        assert_eq!(ExitCode::from_error(&busy), ExitCode::Busy);
        assert!(ExitCode::Busy.is_retryable());
    }

    #[test]
    fn test_is_success_and_blocking() {
        assert!(ExitCode::Success.is_success());
        assert!(!ExitCode::NotFound.is_success());
        assert!(ExitCode::BlockingError.is_blocking());
        assert!(!ExitCode::Degenerate.is_blocking());
    }
}
