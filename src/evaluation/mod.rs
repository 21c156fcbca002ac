//! Partition quality evaluation.
//!
//! Silhouette is O(n²) in pairwise distances; above
//! `evaluation.silhouette_sample_size` vectors it is computed on a seeded
//! sample and the report says so. Davies-Bouldin and Calinski-Harabasz are
//! linear and always use every vector.

mod evaluator;
pub mod metrics;

pub use evaluator::{ClusterSize, EvaluationReport, Evaluator};
