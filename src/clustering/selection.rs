//! Automatic choice of the segment count.
//!
//! Every candidate k in the sweep is fit independently; the chosen k is the
//! half-to-even rounded mean of the inertia elbow and the silhouette-best k,
//! clamped to `[2, k_max]`. The averaging rule changes training outputs, so
//! it is kept exactly as documented here.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::kmeans::{KMeansParams, KMeansResult, kmeans};
use crate::error::{SegmentError, SegmentResult};
use crate::evaluation::metrics::sampled_silhouette;

/// Inertia and silhouette of one candidate k.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub k: usize,
    pub inertia: f64,
    /// `None` when the fit collapsed to fewer than two populated clusters
    pub silhouette: Option<f64>,
}

/// Diagnostics of an automatic k choice, stored with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KSelection {
    pub candidates: Vec<SweepPoint>,
    pub elbow_k: usize,
    pub silhouette_k: usize,
    pub chosen_k: usize,
}

/// Sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepParams {
    pub k_min: usize,
    pub k_max: usize,
    pub base: KMeansParams,
    pub parallel: bool,
    pub silhouette_sample_size: usize,
    pub sample_seed: u64,
}

/// Candidate range `[k_min, min(k_max, n - 1)]`; silhouette needs `k < n`.
pub fn candidate_range(k_min: usize, k_max: usize, n: usize) -> SegmentResult<Vec<usize>> {
    let upper = k_max.min(n.saturating_sub(1));
    if upper < k_min {
        return Err(SegmentError::InsufficientData {
            what: "vectors for automatic k selection",
            required: k_min + 1,
            actual: n,
        });
    }
    Ok((k_min..=upper).collect())
}

/// Fits every candidate k and picks one.
///
/// The token is checked before each candidate; a cancelled sweep returns
/// `Cancelled` naming the first k that was not evaluated.
pub fn select_k<V>(
    vectors: &[V],
    params: &SweepParams,
    cancel: &CancellationToken,
) -> SegmentResult<KSelection>
where
    V: AsRef<[f64]> + Sync,
{
    let candidates = candidate_range(params.k_min, params.k_max, vectors.len())?;

    let fit_one = |k: usize| -> SegmentResult<SweepPoint> {
        if cancel.is_cancelled() {
            return Err(SegmentError::Cancelled { at_k: k });
        }
        let fit = kmeans(
            vectors,
            &KMeansParams {
                k,
                ..params.base.clone()
            },
        )?;
        let point = sweep_point(vectors, k, &fit, params);
        tracing::debug!(
            k,
            inertia = point.inertia,
            silhouette = ?point.silhouette,
            "k-sweep candidate"
        );
        Ok(point)
    };

    // collect() on Result keeps candidate order and surfaces the first error
    let points: Vec<SweepPoint> = if params.parallel {
        candidates
            .par_iter()
            .map(|&k| fit_one(k))
            .collect::<SegmentResult<_>>()?
    } else {
        candidates
            .iter()
            .map(|&k| fit_one(k))
            .collect::<SegmentResult<_>>()?
    };

    let silhouette_k = silhouette_best_k(&points).ok_or(SegmentError::DegenerateClustering {
        k: params.k_min,
        non_empty: 1,
    })?;
    let elbow_k = elbow_k(&points).unwrap_or(silhouette_k);
    let chosen_k = combine(elbow_k, silhouette_k, params.k_max);

    tracing::info!(elbow_k, silhouette_k, chosen_k, "selected segment count");

    Ok(KSelection {
        candidates: points,
        elbow_k,
        silhouette_k,
        chosen_k,
    })
}

fn sweep_point<V: AsRef<[f64]>>(
    vectors: &[V],
    k: usize,
    fit: &KMeansResult,
    params: &SweepParams,
) -> SweepPoint {
    let silhouette = (fit.non_empty_clusters() >= 2).then(|| {
        sampled_silhouette(
            vectors,
            &fit.labels,
            k,
            params.silhouette_sample_size,
            params.sample_seed,
        )
        .0
    });
    SweepPoint {
        k,
        inertia: fit.inertia,
        silhouette,
    }
}

/// Knee of the decreasing inertia curve.
///
/// Both axes are min-max normalised and the knee is the candidate that
/// maximises `1 - x - y`. Returns `None` with fewer than three candidates,
/// a flat curve, or no positive difference.
pub fn elbow_k(points: &[SweepPoint]) -> Option<usize> {
    if points.len() < 3 {
        return None;
    }

    let k_lo = points.first()?.k as f64;
    let k_hi = points.last()?.k as f64;
    let (i_lo, i_hi) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.inertia), hi.max(p.inertia))
        });
    if k_hi <= k_lo || i_hi - i_lo <= f64::EPSILON {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for point in points {
        let x = (point.k as f64 - k_lo) / (k_hi - k_lo);
        let y = (point.inertia - i_lo) / (i_hi - i_lo);
        let difference = 1.0 - x - y;
        if difference > 0.0 && best.is_none_or(|(_, d)| difference > d) {
            best = Some((point.k, difference));
        }
    }
    best.map(|(k, _)| k)
}

/// Candidate with the highest silhouette; the smallest k wins ties.
pub fn silhouette_best_k(points: &[SweepPoint]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for point in points {
        let Some(score) = point.silhouette else {
            continue;
        };
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((point.k, score));
        }
    }
    best.map(|(k, _)| k)
}

/// `round_half_even((elbow + silhouette) / 2)` clamped to `[2, k_max]`.
#[must_use]
pub fn combine(elbow_k: usize, silhouette_k: usize, k_max: usize) -> usize {
    let mean = (elbow_k + silhouette_k) as f64 / 2.0;
    let rounded = mean.round_ties_even() as usize;
    rounded.clamp(2, k_max.max(2))
}
