//! The main library module for segmenta
//!
//! Candidate records are encoded into fixed-width vectors, partitioned with
//! k-means into segments, and persisted as versioned (schema, model) pairs.

pub mod assignment;
pub mod clustering;
pub mod config;
pub mod display;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod interpretation;
pub mod io;
pub mod record;
pub mod registry;
pub mod types;

// Explicit exports for better API clarity
pub use clustering::{ClusterModel, ClusterTrainer};
pub use config::Settings;
pub use encoding::{EncodingSchema, FeatureEncoder};
pub use engine::SegmentationEngine;
pub use error::{SegmentError, SegmentResult};
pub use evaluation::{EvaluationReport, Evaluator};
pub use interpretation::{Interpreter, Segment, SegmentNamer, SegmentSummary, TemplateNamer};
pub use record::{CandidateRecord, CandidateSource, JsonFileSource};
pub use registry::ModelRegistry;
pub use types::{Assignment, CandidateId, ClusterId, EncodedVector, VersionId};
