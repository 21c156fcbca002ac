//! Fitted partition model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kmeans::nearest_centroid;
use super::selection::KSelection;
use crate::error::{SegmentError, SegmentResult};
use crate::types::{ClusterId, VectorDimension};

/// Current model format version.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Identifier of the partitioning algorithm stored with each model.
pub const ALGORITHM_KMEANS_PLUS_PLUS: &str = "kmeans++";

/// Centroids and provenance of one training run.
///
/// Cluster ids are 1-based: centroid `i` is [`ClusterId::from_index(i)`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub format_version: u32,
    pub k: usize,
    pub centroids: Vec<Vec<f64>>,
    pub algorithm: String,
    pub seed: u64,
    pub n_init: usize,
    pub inertia: f64,
    pub iterations: usize,
    pub trained_at: DateTime<Utc>,
    /// Fingerprint of the encoding schema the model was fit against
    pub schema_fingerprint: String,
    pub training_size: usize,
    pub cluster_sizes: Vec<usize>,
    /// Present when k was chosen automatically
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<KSelection>,
}

impl ClusterModel {
    pub fn dimension(&self) -> SegmentResult<VectorDimension> {
        VectorDimension::new(self.centroids.first().map_or(0, Vec::len))
    }

    /// All cluster ids in centroid order.
    pub fn cluster_ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        (0..self.centroids.len()).map(ClusterId::from_index)
    }

    #[must_use]
    pub fn contains(&self, id: ClusterId) -> bool {
        id.index() < self.centroids.len()
    }

    #[must_use]
    pub fn centroid(&self, id: ClusterId) -> Option<&[f64]> {
        self.centroids.get(id.index()).map(Vec::as_slice)
    }

    /// Nearest centroid by Euclidean distance; ties go to the lowest id.
    pub fn predict(&self, vector: &[f64]) -> SegmentResult<ClusterId> {
        self.dimension()?.validate_vector(vector)?;
        let (index, _) = nearest_centroid(vector, &self.centroids);
        Ok(ClusterId::from_index(index))
    }

    pub fn predict_all<V: AsRef<[f64]>>(&self, vectors: &[V]) -> SegmentResult<Vec<ClusterId>> {
        vectors.iter().map(|v| self.predict(v.as_ref())).collect()
    }

    /// Checks internal consistency of a deserialized model.
    pub fn validate(&self) -> SegmentResult<()> {
        if self.k < 2 || self.centroids.len() != self.k {
            return Err(SegmentError::InvalidClusterCount {
                k: self.centroids.len(),
            });
        }
        let dimension = self.dimension()?;
        for centroid in &self.centroids {
            dimension.validate_vector(centroid)?;
        }
        Ok(())
    }
}
