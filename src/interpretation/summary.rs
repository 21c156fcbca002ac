//! Per-segment descriptors derived from centroid deviations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clustering::ClusterModel;
use crate::encoding::EncodingSchema;
use crate::error::{SegmentError, SegmentResult};
use crate::evaluation::metrics::global_centroid;
use crate::record::FieldKind;
use crate::types::{ClusterId, EncodedVector};

/// Whether a segment sits above or below the global mean on a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    High,
    Low,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// One distinguishing feature of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Source field in the candidate record
    pub field: String,
    pub kind: FieldKind,
    /// Encoded feature label, e.g. `location=Berlin`
    pub label: String,
    pub direction: Direction,
    /// Segment centroid minus global centroid on this dimension
    pub deviation: f64,
}

impl std::fmt::Display for FeatureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.direction, self.label)
    }
}

/// What sets one segment apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub cluster_id: ClusterId,
    pub member_count: usize,
    /// Share of labelled vectors in this segment, 0-100
    pub member_percentage: f64,
    /// Ordered by absolute deviation, largest first
    pub descriptors: Vec<FeatureDescriptor>,
}

/// Ranks encoded dimensions per segment and maps them back to fields.
#[derive(Debug, Clone)]
pub struct Interpreter {
    top_n: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

impl Interpreter {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Summarizes every cluster of `model`.
    ///
    /// Segment centroids are the means of their labelled members; a cluster
    /// with no members falls back to the model centroid and reports zero
    /// members. `None` labels are noise and count toward no segment, but
    /// still contribute to the global centroid.
    pub fn interpret(
        &self,
        model: &ClusterModel,
        vectors: &[EncodedVector],
        labels: &[Option<ClusterId>],
        schema: &EncodingSchema,
    ) -> SegmentResult<BTreeMap<ClusterId, SegmentSummary>> {
        let fingerprint = schema.fingerprint()?;
        if fingerprint != model.schema_fingerprint {
            return Err(SegmentError::ArtifactMismatch {
                expected: model.schema_fingerprint.clone(),
                actual: fingerprint,
            });
        }
        if labels.len() != vectors.len() {
            return Err(SegmentError::InsufficientData {
                what: "labels",
                required: vectors.len(),
                actual: labels.len(),
            });
        }

        let dimension = schema.dimension()?;
        for vector in vectors {
            dimension.validate_vector(vector.as_slice())?;
        }

        let width = dimension.get();
        let mut sums: BTreeMap<ClusterId, (Vec<f64>, usize)> = model
            .cluster_ids()
            .map(|id| (id, (vec![0.0; width], 0)))
            .collect();

        for (vector, label) in vectors.iter().zip(labels) {
            let Some(id) = label else { continue };
            let (sum, count) = sums.get_mut(id).ok_or(SegmentError::ForeignLabel {
                label: id.get(),
                k: model.k,
            })?;
            for (acc, &x) in sum.iter_mut().zip(vector.as_slice()) {
                *acc += x;
            }
            *count += 1;
        }

        let global = global_centroid(vectors);
        let labelled: usize = sums.values().map(|(_, count)| count).sum();

        let mut summaries = BTreeMap::new();
        for (id, (sum, count)) in sums {
            let centroid: Vec<f64> = if count > 0 {
                sum.iter().map(|s| s / count as f64).collect()
            } else {
                model.centroid(id).map(<[f64]>::to_vec).unwrap_or(sum)
            };

            let member_percentage = if labelled > 0 {
                100.0 * count as f64 / labelled as f64
            } else {
                0.0
            };

            summaries.insert(
                id,
                SegmentSummary {
                    cluster_id: id,
                    member_count: count,
                    member_percentage,
                    descriptors: self.descriptors(&centroid, &global, schema),
                },
            );
        }

        Ok(summaries)
    }

    fn descriptors(
        &self,
        centroid: &[f64],
        global: &[f64],
        schema: &EncodingSchema,
    ) -> Vec<FeatureDescriptor> {
        let mut ranked: Vec<(usize, f64)> = centroid
            .iter()
            .zip(global)
            .map(|(c, g)| c - g)
            .enumerate()
            .filter(|(_, deviation)| *deviation != 0.0)
            .collect();
        // stable sort keeps encoding order among equal deviations
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

        ranked
            .into_iter()
            .take(self.top_n)
            .filter_map(|(dim, deviation)| {
                let origin = schema.feature_origin(dim)?;
                Some(FeatureDescriptor {
                    field: origin.field,
                    kind: origin.kind,
                    label: origin.label,
                    direction: if deviation > 0.0 {
                        Direction::High
                    } else {
                        Direction::Low
                    },
                    deviation,
                })
            })
            .collect()
    }
}
