//! Cluster trainer: fixed or automatically selected k.

use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::kmeans::{KMeansParams, kmeans};
use super::model::{ALGORITHM_KMEANS_PLUS_PLUS, ClusterModel, MODEL_FORMAT_VERSION};
use super::selection::{KSelection, SweepParams, select_k};
use crate::config::{EvaluationConfig, Settings, TrainingConfig};
use crate::encoding::EncodingSchema;
use crate::error::{SegmentError, SegmentResult};
use crate::types::EncodedVector;

/// Fits [`ClusterModel`]s from encoded vectors.
#[derive(Debug, Clone)]
pub struct ClusterTrainer {
    config: TrainingConfig,
    silhouette_sample_size: usize,
    sample_seed: u64,
}

impl ClusterTrainer {
    pub fn new(config: TrainingConfig, evaluation: &EvaluationConfig) -> SegmentResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            silhouette_sample_size: evaluation.silhouette_sample_size,
            sample_seed: evaluation.sample_seed,
        })
    }

    pub fn from_settings(settings: &Settings) -> SegmentResult<Self> {
        Self::new(settings.training.clone(), &settings.evaluation)
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains a model. With `k = None` the segment count is chosen over
    /// `[k_min, k_max]`.
    pub fn train(
        &self,
        vectors: &[EncodedVector],
        k: Option<usize>,
        schema: &EncodingSchema,
    ) -> SegmentResult<ClusterModel> {
        self.train_with_cancel(vectors, k, schema, &CancellationToken::new())
    }

    /// Like [`train`](Self::train), checking `cancel` between sweep candidates.
    pub fn train_with_cancel(
        &self,
        vectors: &[EncodedVector],
        k: Option<usize>,
        schema: &EncodingSchema,
        cancel: &CancellationToken,
    ) -> SegmentResult<ClusterModel> {
        let started = Instant::now();

        if let Some(k) = k {
            if k < 2 {
                return Err(SegmentError::InvalidClusterCount { k });
            }
            if vectors.len() < k {
                return Err(SegmentError::InsufficientData {
                    what: "vectors",
                    required: k,
                    actual: vectors.len(),
                });
            }
        }
        if vectors.len() < 2 {
            return Err(SegmentError::InsufficientData {
                what: "vectors",
                required: 2,
                actual: vectors.len(),
            });
        }

        let dimension = schema.dimension()?;
        for vector in vectors {
            dimension.validate_vector(vector.as_slice())?;
        }

        tracing::info!(
            n = vectors.len(),
            d = dimension.get(),
            k = ?k,
            "training started"
        );

        let base = KMeansParams {
            k: k.unwrap_or(self.config.k_min),
            n_init: self.config.n_init,
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            seed: self.config.seed,
        };

        let selection = match k {
            Some(_) => None,
            None => Some(self.sweep(vectors, &base, cancel)?),
        };
        let k = selection.as_ref().map_or(base.k, |s| s.chosen_k);

        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled { at_k: k });
        }

        let fit = kmeans(vectors, &KMeansParams { k, ..base })?;
        let non_empty = fit.non_empty_clusters();
        if non_empty < 2 {
            return Err(SegmentError::DegenerateClustering { k, non_empty });
        }

        let model = ClusterModel {
            format_version: MODEL_FORMAT_VERSION,
            k,
            cluster_sizes: fit.cluster_sizes(),
            centroids: fit.centroids,
            algorithm: ALGORITHM_KMEANS_PLUS_PLUS.to_string(),
            seed: self.config.seed,
            n_init: self.config.n_init,
            inertia: fit.inertia,
            iterations: fit.iterations,
            trained_at: Utc::now(),
            schema_fingerprint: schema.fingerprint()?,
            training_size: vectors.len(),
            selection,
        };

        tracing::info!(
            k = model.k,
            inertia = model.inertia,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "training finished"
        );

        Ok(model)
    }

    fn sweep(
        &self,
        vectors: &[EncodedVector],
        base: &KMeansParams,
        cancel: &CancellationToken,
    ) -> SegmentResult<KSelection> {
        let params = SweepParams {
            k_min: self.config.k_min,
            k_max: self.config.k_max,
            base: base.clone(),
            parallel: self.config.parallel_sweep,
            silhouette_sample_size: self.silhouette_sample_size,
            sample_seed: self.sample_seed,
        };

        if self.config.parallel_sweep && self.config.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| SegmentError::Config {
                    reason: format!("cannot build sweep thread pool: {e}"),
                })?;
            pool.install(|| select_k(vectors, &params, cancel))
        } else {
            select_k(vectors, &params, cancel)
        }
    }
}
