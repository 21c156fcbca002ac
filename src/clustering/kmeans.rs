//! Seeded k-means with k-means++ initialization.
//!
//! # Algorithm Details
//! - Distance metric: squared Euclidean
//! - Initialization: k-means++ driven by a seeded `StdRng`
//! - Restarts: `n_init` independent runs, lowest inertia wins
//! - Convergence: total squared centroid shift below `tolerance` scaled by
//!   the mean per-dimension variance of the data, or no label changes
//! - Empty clusters are re-seeded at the point farthest from its centroid
//!
//! # Performance Characteristics
//! - O(n * k * d * iterations) time per restart
//! - O(k * d) space for centroids

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{SegmentError, SegmentResult};

/// Epsilon for floating-point comparisons.
const EPSILON: f64 = 1e-12;

/// Parameters of one k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
}

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster centroids, each of the input dimension.
    pub centroids: Vec<Vec<f64>>,

    /// Zero-based centroid index for each input vector.
    pub labels: Vec<usize>,

    /// Within-cluster sum of squared distances.
    pub inertia: f64,

    /// Iterations of the winning restart.
    pub iterations: usize,

    /// Whether the winning restart converged before `max_iterations`.
    pub converged: bool,
}

impl KMeansResult {
    /// Member count per centroid.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Number of centroids with at least one member.
    #[must_use]
    pub fn non_empty_clusters(&self) -> usize {
        self.cluster_sizes().iter().filter(|&&s| s > 0).count()
    }
}

/// Runs `n_init` seeded k-means restarts and keeps the lowest-inertia one.
///
/// Fails with `InvalidClusterCount` for `k == 0`, `InsufficientData` when
/// there are fewer vectors than `k` and `DimensionMismatch` when input
/// vectors disagree on length.
pub fn kmeans<V: AsRef<[f64]>>(vectors: &[V], params: &KMeansParams) -> SegmentResult<KMeansResult> {
    if params.k == 0 {
        return Err(SegmentError::InvalidClusterCount { k: params.k });
    }

    if vectors.len() < params.k {
        return Err(SegmentError::InsufficientData {
            what: "vectors",
            required: params.k,
            actual: vectors.len(),
        });
    }

    // Ensure all vectors have the same dimension
    let dimension = vectors[0].as_ref().len();
    if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != dimension) {
        return Err(SegmentError::DimensionMismatch {
            expected: dimension,
            actual: bad.as_ref().len(),
        });
    }

    let threshold = params.tolerance * mean_variance(vectors, dimension);
    let mut seeds = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansResult> = None;

    for _ in 0..params.n_init.max(1) {
        let mut rng = StdRng::seed_from_u64(seeds.random());
        let run = single_run(vectors, params, threshold, &mut rng);

        let better = best
            .as_ref()
            .is_none_or(|current| run.inertia < current.inertia);
        if better {
            best = Some(run);
        }
    }

    let best = best.ok_or(SegmentError::InvalidClusterCount { k: params.k })?;

    if !best.converged {
        tracing::warn!(
            k = params.k,
            iterations = best.iterations,
            "k-means did not converge within the iteration cap"
        );
    }

    Ok(best)
}

fn single_run<V: AsRef<[f64]>>(
    vectors: &[V],
    params: &KMeansParams,
    threshold: f64,
    rng: &mut StdRng,
) -> KMeansResult {
    let mut centroids = initialize_centroids_kmeans_plus_plus(vectors, params.k, rng);
    let mut labels = assign_all(vectors, &centroids);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;

        // Update step: recompute centroids
        let new_centroids = update_centroids(vectors, &labels, &centroids);
        let shift = centroid_shift(&centroids, &new_centroids);
        centroids = new_centroids;

        // Assignment step: assign each vector to nearest centroid
        let new_labels = assign_all(vectors, &centroids);
        let unchanged = new_labels == labels;
        labels = new_labels;

        if unchanged || shift <= threshold {
            converged = true;
            break;
        }
    }

    let inertia = inertia(vectors, &centroids, &labels);

    KMeansResult {
        centroids,
        labels,
        inertia,
        iterations,
        converged,
    }
}

/// Squared Euclidean distance.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Index of and squared distance to the nearest centroid. Ties go to the
/// lowest index.
pub fn nearest_centroid<C: AsRef<[f64]>>(vector: &[f64], centroids: &[C]) -> (usize, f64) {
    let mut best_distance = f64::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean(vector, centroid.as_ref());
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    (best_cluster, best_distance)
}

fn assign_all<V: AsRef<[f64]>>(vectors: &[V], centroids: &[Vec<f64>]) -> Vec<usize> {
    vectors
        .iter()
        .map(|v| nearest_centroid(v.as_ref(), centroids).0)
        .collect()
}

/// Within-cluster sum of squared distances for a labelling.
pub fn inertia<V: AsRef<[f64]>>(vectors: &[V], centroids: &[Vec<f64>], labels: &[usize]) -> f64 {
    vectors
        .iter()
        .zip(labels)
        .map(|(v, &label)| squared_euclidean(v.as_ref(), &centroids[label]))
        .sum()
}

/// Updates centroids as the mean of their assigned vectors.
///
/// A centroid that lost all members moves to the vector farthest from its
/// own centroid; each vector is used for at most one relocation.
fn update_centroids<V: AsRef<[f64]>>(
    vectors: &[V],
    labels: &[usize],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let dimension = previous[0].len();
    let mut new_centroids = vec![vec![0.0; dimension]; k];
    let mut cluster_sizes = vec![0usize; k];

    // Sum vectors for each cluster
    for (vector, &label) in vectors.iter().zip(labels) {
        for (acc, &value) in new_centroids[label].iter_mut().zip(vector.as_ref()) {
            *acc += value;
        }
        cluster_sizes[label] += 1;
    }

    for (centroid, &size) in new_centroids.iter_mut().zip(&cluster_sizes) {
        if size > 0 {
            for value in centroid.iter_mut() {
                *value /= size as f64;
            }
        }
    }

    if cluster_sizes.contains(&0) {
        let mut by_distance: Vec<(usize, f64)> = vectors
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (v, &label))| (i, squared_euclidean(v.as_ref(), &previous[label])))
            .collect();
        // Farthest first; stable on index for equal distances
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut donors = by_distance.into_iter().map(|(i, _)| i);

        for (centroid, &size) in new_centroids.iter_mut().zip(&cluster_sizes) {
            if size > 0 {
                continue;
            }
            if let Some(donor) = donors.next() {
                *centroid = vectors[donor].as_ref().to_vec();
            }
        }
    }

    new_centroids
}

/// Initializes centroids using the k-means++ algorithm.
///
/// The first centroid is uniform; each next one is drawn with probability
/// proportional to the squared distance to the nearest chosen centroid.
/// When every remaining point coincides with a chosen centroid the rest are
/// drawn uniformly, so the result always has exactly `k` centroids.
fn initialize_centroids_kmeans_plus_plus<V: AsRef<[f64]>>(
    vectors: &[V],
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);

    // Choose first centroid randomly
    let first_idx = rng.random_range(0..vectors.len());
    centroids.push(vectors[first_idx].as_ref().to_vec());

    let mut distances: Vec<f64> = vectors
        .iter()
        .map(|v| squared_euclidean(v.as_ref(), &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total_distance: f64 = distances.iter().sum();

        let chosen = if total_distance < EPSILON {
            // All points are coincident with existing centroids
            rng.random_range(0..vectors.len())
        } else {
            // Choose next centroid with probability proportional to squared distance
            let target = rng.random::<f64>() * total_distance;
            let mut cumulative = 0.0;
            let mut chosen = None;
            for (i, &distance) in distances.iter().enumerate() {
                cumulative += distance;
                if distance > 0.0 && cumulative >= target {
                    chosen = Some(i);
                    break;
                }
            }
            // Rounding can leave the target just past the last bucket
            chosen.unwrap_or_else(|| {
                distances
                    .iter()
                    .rposition(|&d| d > 0.0)
                    .unwrap_or(vectors.len() - 1)
            })
        };

        let centroid = vectors[chosen].as_ref().to_vec();
        for (distance, vector) in distances.iter_mut().zip(vectors) {
            *distance = distance.min(squared_euclidean(vector.as_ref(), &centroid));
        }
        centroids.push(centroid);
    }

    centroids
}

/// Total squared movement of centroids between iterations.
fn centroid_shift(old: &[Vec<f64>], new: &[Vec<f64>]) -> f64 {
    old.iter()
        .zip(new)
        .map(|(old_c, new_c)| squared_euclidean(old_c, new_c))
        .sum()
}

/// Mean over dimensions of the per-dimension population variance.
fn mean_variance<V: AsRef<[f64]>>(vectors: &[V], dimension: usize) -> f64 {
    if dimension == 0 || vectors.is_empty() {
        return 0.0;
    }
    let n = vectors.len() as f64;
    let mut mean = vec![0.0; dimension];
    for vector in vectors {
        for (m, &x) in mean.iter_mut().zip(vector.as_ref()) {
            *m += x / n;
        }
    }
    let total: f64 = vectors
        .iter()
        .map(|v| squared_euclidean(v.as_ref(), &mean))
        .sum();
    total / n / dimension as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize) -> KMeansParams {
        KMeansParams {
            k,
            n_init: 4,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.2],
            vec![0.2, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.8, 10.2],
        ]
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let vectors = two_blobs();
        let result = kmeans(&vectors, &params(2)).unwrap();

        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.labels.len(), 6);
        assert!(result.converged);

        // First three vectors should be in one cluster, last three in another
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[1], result.labels[2]);
        assert_eq!(result.labels[3], result.labels[4]);
        assert_eq!(result.labels[4], result.labels[5]);
        assert_ne!(result.labels[0], result.labels[3]);
        assert_eq!(result.cluster_sizes(), vec![3, 3]);
        assert!(result.inertia < 1.0);
    }

    #[test]
    fn test_kmeans_is_deterministic_for_seed() {
        let vectors = two_blobs();
        let a = kmeans(&vectors, &params(3)).unwrap();
        let b = kmeans(&vectors, &params(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kmeans_invalid_inputs() {
        let vectors = two_blobs();
        assert!(matches!(
            kmeans(&vectors, &params(0)),
            Err(SegmentError::InvalidClusterCount { k: 0 })
        ));
        assert!(matches!(
            kmeans(&vectors, &params(7)),
            Err(SegmentError::InsufficientData {
                required: 7,
                actual: 6,
                ..
            })
        ));

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            kmeans(&ragged, &params(1)),
            Err(SegmentError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_identical_points_keep_k_centroids() {
        let vectors = vec![vec![1.0, 1.0]; 5];
        let result = kmeans(&vectors, &params(3)).unwrap();
        assert_eq!(result.centroids.len(), 3);
        assert_eq!(result.inertia, 0.0);
        // every point ties; the lowest index wins
        assert_eq!(result.non_empty_clusters(), 1);
    }

    #[test]
    fn test_nearest_centroid_tie_breaks_low() {
        let centroids = vec![vec![1.0], vec![-1.0]];
        assert_eq!(nearest_centroid(&[0.0], &centroids).0, 0);
        assert_eq!(nearest_centroid(&[-0.5], &centroids).0, 1);
    }

    #[test]
    fn test_distances() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_empty_cluster_relocates_to_farthest_point() {
        let vectors = vec![vec![0.0], vec![1.0], vec![9.0]];
        let previous = vec![vec![0.5], vec![100.0]];
        let labels = vec![0, 0, 0];

        let updated = update_centroids(&vectors, &labels, &previous);
        assert!((updated[0][0] - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(updated[1], vec![9.0]);
    }
}
