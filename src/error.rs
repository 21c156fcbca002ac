//! Error types for the segmentation engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages. None of these errors are
//! retried internally; retry policy belongs to whoever schedules training.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for encoding, training, registry and assignment operations
#[derive(Error, Debug)]
pub enum SegmentError {
    /// Not enough records or vectors for the requested operation
    #[error("Insufficient data: {required} {what} required, got {actual}")]
    InsufficientData {
        what: &'static str,
        required: usize,
        actual: usize,
    },

    /// Assignment or evaluation requested before any successful training
    #[error("No trained model found in registry '{path}'")]
    ModelNotTrained { path: PathBuf },

    /// A field the schema requires is structurally absent from a record
    #[error("Record '{candidate_id}' is missing required field '{field}'")]
    SchemaMismatch { candidate_id: String, field: String },

    /// Training produced fewer than two non-empty segments
    #[error("Clustering collapsed to {non_empty} non-empty segment(s) (requested k = {k})")]
    DegenerateClustering { k: usize, non_empty: usize },

    /// A second training run was attempted while one was in flight
    #[error("Another training run is already committing to '{path}'")]
    ConcurrentTraining { path: PathBuf },

    #[error("Invalid segment count: {k}. A segmentation needs k >= 2")]
    InvalidClusterCount { k: usize },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Schema and model do not belong to the same training run
    #[error("Model was fit against schema {expected}, but schema {actual} was supplied")]
    ArtifactMismatch { expected: String, actual: String },

    #[error("Model version '{version}' not found")]
    VersionNotFound { version: String },

    #[error("Registry artifact at '{path}' is corrupted: {reason}")]
    RegistryCorrupted { path: PathBuf, reason: String },

    /// A field is present but carries a value of the wrong type
    #[error("Record '{candidate_id}' has an invalid value for field '{field}': {reason}")]
    InvalidRecord {
        candidate_id: String,
        field: String,
        reason: String,
    },

    #[error("Label '{label}' is not produced by the model (k = {k})")]
    ForeignLabel { label: u32, k: usize },

    #[error("Training was cancelled before k = {at_k} was evaluated")]
    Cancelled { at_k: usize },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O failure at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SegmentError {
    /// Convenience constructor for I/O errors with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::ModelNotTrained { .. } => "MODEL_NOT_TRAINED",
            Self::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            Self::DegenerateClustering { .. } => "DEGENERATE_CLUSTERING",
            Self::ConcurrentTraining { .. } => "CONCURRENT_TRAINING",
            Self::InvalidClusterCount { .. } => "INVALID_CLUSTER_COUNT",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::ArtifactMismatch { .. } => "ARTIFACT_MISMATCH",
            Self::VersionNotFound { .. } => "VERSION_NOT_FOUND",
            Self::RegistryCorrupted { .. } => "REGISTRY_CORRUPTED",
            Self::InvalidRecord { .. } => "INVALID_RECORD",
            Self::ForeignLabel { .. } => "FOREIGN_LABEL",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Config { .. } => "CONFIG_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::InsufficientData { .. } => vec![
                "Supply more candidate records",
                "Lower encoder.min_records or request a smaller k",
            ],
            Self::ModelNotTrained { .. } => vec![
                "Run 'segmenta train --input <candidates.json>' first",
                "Check that registry_path points at the directory used for training",
            ],
            Self::SchemaMismatch { .. } => vec![
                "Fix the upstream extract so every record carries all encoder fields",
                "Send null for unknown values instead of dropping the key",
            ],
            Self::DegenerateClustering { .. } => vec![
                "Retry with a different k",
                "Inspect the input data: records may be nearly identical",
            ],
            Self::ConcurrentTraining { .. } => vec![
                "Wait for the running training to finish and retry",
                "Set registry.on_concurrent_training = \"queue\" to wait automatically",
            ],
            Self::ArtifactMismatch { .. } | Self::RegistryCorrupted { .. } => vec![
                "Load schema and model through the registry so they stay paired",
                "Retrain to produce a fresh version",
            ],
            Self::VersionNotFound { .. } => vec!["Run 'segmenta versions' to list committed versions"],
            Self::InvalidRecord { .. } => {
                vec!["Numeric fields accept numbers or numeric strings only"]
            }
            Self::Config { .. } => vec!["Run 'segmenta config' to inspect the active settings"],
            Self::Io { .. } => vec!["Check disk space and file permissions"],
            _ => vec![],
        }
    }
}

/// Result type alias for engine operations
pub type SegmentResult<T> = Result<T, SegmentError>;
