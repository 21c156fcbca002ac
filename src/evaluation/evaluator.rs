//! Partition quality reports over labelled vectors.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metrics::{calinski_harabasz, davies_bouldin, sampled_silhouette};
use crate::clustering::ClusterModel;
use crate::config::EvaluationConfig;
use crate::error::{SegmentError, SegmentResult};
use crate::types::{ClusterId, EncodedVector};

/// Members of one cluster in an evaluated partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSize {
    pub cluster_id: ClusterId,
    pub members: usize,
}

/// Partition quality of a model against a set of vectors.
///
/// When the partition is degenerate (fewer than two populated clusters or
/// a singleton cluster) `valid` is false and every metric is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub valid: bool,
    pub silhouette: Option<f64>,
    pub davies_bouldin: Option<f64>,
    pub calinski_harabasz: Option<f64>,
    /// Labelled vectors that entered the metrics (noise excluded)
    pub n_samples: usize,
    pub n_clusters: usize,
    pub cluster_sizes: Vec<ClusterSize>,
    /// Silhouette was computed on a seeded sample
    pub sampled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// Computes [`EvaluationReport`]s.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    /// Evaluates an explicit labelling. `None` labels are noise and are left
    /// out of every metric.
    pub fn evaluate(
        &self,
        model: &ClusterModel,
        vectors: &[EncodedVector],
        labels: &[Option<ClusterId>],
    ) -> SegmentResult<EvaluationReport> {
        if labels.len() != vectors.len() {
            return Err(SegmentError::InsufficientData {
                what: "labels",
                required: vectors.len(),
                actual: labels.len(),
            });
        }

        let dimension = model.dimension()?;
        for vector in vectors {
            dimension.validate_vector(vector.as_slice())?;
        }

        let mut members: BTreeMap<ClusterId, Vec<usize>> = BTreeMap::new();
        for (i, label) in labels.iter().enumerate() {
            let Some(id) = label else { continue };
            if !model.contains(*id) {
                return Err(SegmentError::ForeignLabel {
                    label: id.get(),
                    k: model.k,
                });
            }
            members.entry(*id).or_default().push(i);
        }

        let cluster_sizes: Vec<ClusterSize> = members
            .iter()
            .map(|(id, rows)| ClusterSize {
                cluster_id: *id,
                members: rows.len(),
            })
            .collect();
        let n_clusters = members.len();
        let n_samples = cluster_sizes.iter().map(|c| c.members).sum();

        let invalid_reason = if n_clusters < 2 {
            Some(format!("{n_clusters} populated cluster(s); at least 2 required"))
        } else {
            cluster_sizes
                .iter()
                .find(|c| c.members < 2)
                .map(|c| format!("cluster {} has a single member", c.cluster_id))
        };

        if let Some(reason) = invalid_reason {
            tracing::info!(%reason, "partition is degenerate, metrics not computed");
            return Ok(EvaluationReport {
                valid: false,
                silhouette: None,
                davies_bouldin: None,
                calinski_harabasz: None,
                n_samples,
                n_clusters,
                cluster_sizes,
                sampled: false,
                invalid_reason: Some(reason),
                computed_at: Utc::now(),
            });
        }

        // Dense labels over the non-noise rows
        let mut rows: Vec<&[f64]> = Vec::with_capacity(n_samples);
        let mut dense: Vec<usize> = Vec::with_capacity(n_samples);
        for (position, indices) in members.values().enumerate() {
            for &i in indices {
                rows.push(vectors[i].as_slice());
                dense.push(position);
            }
        }

        let (silhouette, sampled) = sampled_silhouette(
            &rows,
            &dense,
            n_clusters,
            self.config.silhouette_sample_size,
            self.config.sample_seed,
        );
        let davies_bouldin = davies_bouldin(&rows, &dense, n_clusters);
        let calinski_harabasz = calinski_harabasz(&rows, &dense, n_clusters);

        tracing::debug!(
            silhouette,
            davies_bouldin,
            calinski_harabasz,
            sampled,
            "evaluated partition"
        );

        Ok(EvaluationReport {
            valid: true,
            silhouette: Some(silhouette),
            davies_bouldin: Some(davies_bouldin).filter(|v| v.is_finite()),
            calinski_harabasz: Some(calinski_harabasz).filter(|v| v.is_finite()),
            n_samples,
            n_clusters,
            cluster_sizes,
            sampled,
            invalid_reason: None,
            computed_at: Utc::now(),
        })
    }

    /// Evaluates the model's own nearest-centroid labelling of `vectors`.
    pub fn evaluate_predicted(
        &self,
        model: &ClusterModel,
        vectors: &[EncodedVector],
    ) -> SegmentResult<EvaluationReport> {
        let labels: Vec<Option<ClusterId>> =
            model.predict_all(vectors)?.into_iter().map(Some).collect();
        self.evaluate(model, vectors, &labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::model::{ALGORITHM_KMEANS_PLUS_PLUS, MODEL_FORMAT_VERSION};

    fn model() -> ClusterModel {
        ClusterModel {
            format_version: MODEL_FORMAT_VERSION,
            k: 2,
            centroids: vec![vec![0.0, 0.5], vec![10.0, 0.5]],
            algorithm: ALGORITHM_KMEANS_PLUS_PLUS.to_string(),
            seed: 1,
            n_init: 1,
            inertia: 1.0,
            iterations: 1,
            trained_at: Utc::now(),
            schema_fingerprint: String::new(),
            training_size: 4,
            cluster_sizes: vec![2, 2],
            selection: None,
        }
    }

    fn vectors() -> Vec<EncodedVector> {
        [[0.0, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]]
            .iter()
            .map(|v| EncodedVector::from_values(v.to_vec()))
            .collect()
    }

    fn id(n: u32) -> Option<ClusterId> {
        ClusterId::new(n)
    }

    #[test]
    fn test_valid_partition() {
        let report = Evaluator::default()
            .evaluate_predicted(&model(), &vectors())
            .unwrap();
        assert!(report.valid);
        assert_eq!(report.n_clusters, 2);
        assert_eq!(report.n_samples, 4);
        assert!(report.silhouette.unwrap() > 0.8);
        assert!((report.davies_bouldin.unwrap() - 0.1).abs() < 1e-12);
        assert!(report.calinski_harabasz.unwrap() > 100.0);
        assert!(!report.sampled);
    }

    #[test]
    fn test_singleton_cluster_is_invalid_not_error() {
        let labels = vec![id(1), id(1), id(1), id(2)];
        let report = Evaluator::default()
            .evaluate(&model(), &vectors(), &labels)
            .unwrap();
        assert!(!report.valid);
        assert!(report.silhouette.is_none());
        assert!(report.davies_bouldin.is_none());
        assert!(report.calinski_harabasz.is_none());
        assert!(report.invalid_reason.is_some());
    }

    #[test]
    fn test_single_cluster_is_invalid() {
        let labels = vec![id(1); 4];
        let report = Evaluator::default()
            .evaluate(&model(), &vectors(), &labels)
            .unwrap();
        assert!(!report.valid);
        assert_eq!(report.n_clusters, 1);
    }

    #[test]
    fn test_noise_is_excluded() {
        let labels = vec![id(1), id(1), id(2), None];
        let report = Evaluator::default()
            .evaluate(&model(), &vectors(), &labels)
            .unwrap();
        // cluster 2 is left with one member once noise is dropped
        assert!(!report.valid);
        assert_eq!(report.n_samples, 3);
    }

    #[test]
    fn test_foreign_label_and_length_mismatch() {
        let labels = vec![id(1), id(1), id(2), id(5)];
        assert!(matches!(
            Evaluator::default().evaluate(&model(), &vectors(), &labels),
            Err(SegmentError::ForeignLabel { label: 5, k: 2 })
        ));
        assert!(matches!(
            Evaluator::default().evaluate(&model(), &vectors(), &labels[..2]),
            Err(SegmentError::InsufficientData { .. })
        ));
    }
}
