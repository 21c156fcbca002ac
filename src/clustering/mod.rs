//! Centroid-based partitioning of encoded candidate vectors.
//!
//! - [`kmeans`]: seeded k-means++ with restarts
//! - [`selection`]: automatic segment count (elbow + silhouette)
//! - [`trainer`]: [`ClusterTrainer`], the training entry point
//! - [`model`]: [`ClusterModel`], the persisted result

pub mod kmeans;
pub mod model;
pub mod selection;
pub mod trainer;

pub use kmeans::{KMeansParams, KMeansResult};
pub use model::ClusterModel;
pub use selection::{KSelection, SweepPoint};
pub use trainer::ClusterTrainer;
