//! Partition quality metrics over dense zero-based labels.
//!
//! All functions take `labels[i] < k` for every vector and assume the
//! caller already checked that at least two clusters are populated.
//! Distances are Euclidean.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::clustering::kmeans::{euclidean, squared_euclidean};

/// Mean silhouette coefficient over all vectors, in `[-1, 1]`.
///
/// Members of singleton clusters score 0. Pairwise distances make this
/// O(n²); see [`sample_indices`] for the sampled variant.
pub fn silhouette<V: AsRef<[f64]>>(vectors: &[V], labels: &[usize], k: usize) -> f64 {
    let n = vectors.len();
    if n == 0 {
        return 0.0;
    }

    let mut sizes = vec![0usize; k];
    for &label in labels {
        sizes[label] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += euclidean(vectors[i].as_ref(), vectors[j].as_ref());
            }
        }

        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        if !b.is_finite() {
            continue;
        }

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    total / n as f64
}

/// Deterministic sorted sample of `size` indices out of `n`, or `None` when
/// no sampling is needed (`size == 0` or `n <= size`).
pub fn sample_indices(n: usize, size: usize, seed: u64) -> Option<Vec<usize>> {
    if size == 0 || n <= size {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, n, size).into_vec();
    picked.sort_unstable();
    Some(picked)
}

/// Silhouette on a seeded sample when `n` exceeds `sample_size`.
/// Returns the score and whether sampling was applied.
pub fn sampled_silhouette<V: AsRef<[f64]>>(
    vectors: &[V],
    labels: &[usize],
    k: usize,
    sample_size: usize,
    seed: u64,
) -> (f64, bool) {
    match sample_indices(vectors.len(), sample_size, seed) {
        Some(indices) => {
            let sample: Vec<&[f64]> = indices.iter().map(|&i| vectors[i].as_ref()).collect();
            let sample_labels: Vec<usize> = indices.iter().map(|&i| labels[i]).collect();
            (silhouette(&sample, &sample_labels, k), true)
        }
        None => (silhouette(vectors, labels, k), false),
    }
}

/// Per-cluster mean vectors. Empty clusters get a zero centroid.
pub fn label_centroids<V: AsRef<[f64]>>(vectors: &[V], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dimension = vectors.first().map_or(0, |v| v.as_ref().len());
    let mut centroids = vec![vec![0.0; dimension]; k];
    let mut sizes = vec![0usize; k];

    for (vector, &label) in vectors.iter().zip(labels) {
        for (acc, &x) in centroids[label].iter_mut().zip(vector.as_ref()) {
            *acc += x;
        }
        sizes[label] += 1;
    }
    for (centroid, &size) in centroids.iter_mut().zip(&sizes) {
        if size > 0 {
            centroid.iter_mut().for_each(|x| *x /= size as f64);
        }
    }
    centroids
}

/// Mean of all vectors.
pub fn global_centroid<V: AsRef<[f64]>>(vectors: &[V]) -> Vec<f64> {
    let dimension = vectors.first().map_or(0, |v| v.as_ref().len());
    let mut mean = vec![0.0; dimension];
    if vectors.is_empty() {
        return mean;
    }
    for vector in vectors {
        for (m, &x) in mean.iter_mut().zip(vector.as_ref()) {
            *m += x;
        }
    }
    let n = vectors.len() as f64;
    mean.iter_mut().for_each(|m| *m /= n);
    mean
}

/// Davies-Bouldin index (lower is better, `>= 0`).
///
/// Returns infinity when two populated clusters share a centroid.
pub fn davies_bouldin<V: AsRef<[f64]>>(vectors: &[V], labels: &[usize], k: usize) -> f64 {
    let centroids = label_centroids(vectors, labels, k);
    let mut scatter = vec![0.0; k];
    let mut sizes = vec![0usize; k];

    for (vector, &label) in vectors.iter().zip(labels) {
        scatter[label] += euclidean(vector.as_ref(), &centroids[label]);
        sizes[label] += 1;
    }
    for (s, &size) in scatter.iter_mut().zip(&sizes) {
        if size > 0 {
            *s /= size as f64;
        }
    }

    let populated: Vec<usize> = (0..k).filter(|&c| sizes[c] > 0).collect();
    if populated.len() < 2 {
        return 0.0;
    }

    let total: f64 = populated
        .iter()
        .map(|&i| {
            populated
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let separation = euclidean(&centroids[i], &centroids[j]);
                    if separation > 0.0 {
                        (scatter[i] + scatter[j]) / separation
                    } else {
                        f64::INFINITY
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();

    total / populated.len() as f64
}

/// Calinski-Harabasz index (higher is better, `>= 0`).
///
/// A partition with zero within-cluster dispersion scores 1.0.
pub fn calinski_harabasz<V: AsRef<[f64]>>(vectors: &[V], labels: &[usize], k: usize) -> f64 {
    let n = vectors.len();
    let centroids = label_centroids(vectors, labels, k);
    let overall = global_centroid(vectors);

    let mut sizes = vec![0usize; k];
    let mut within = 0.0;
    for (vector, &label) in vectors.iter().zip(labels) {
        within += squared_euclidean(vector.as_ref(), &centroids[label]);
        sizes[label] += 1;
    }

    let between: f64 = centroids
        .iter()
        .zip(&sizes)
        .map(|(c, &size)| size as f64 * squared_euclidean(c, &overall))
        .sum();

    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if populated < 2 || n <= populated {
        return 0.0;
    }
    if within == 0.0 {
        return 1.0;
    }

    (between / (populated - 1) as f64) / (within / (n - populated) as f64)
}
