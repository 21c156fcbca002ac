//! Test: two well separated candidate groups
//!
//! Training on two Gaussian groups must recover them: silhouette above 0.7,
//! an even split, and the same result for the same seed.

use crate::common::{numeric_engine, numeric_settings, two_group_records};
use segmenta::SegmentationEngine;
use segmenta::types::ClusterId;
use std::collections::HashSet;
use tempfile::TempDir;

#[test]
fn test_two_groups_are_recovered() {
    let (engine, _dir) = numeric_engine();
    let records = two_group_records(100, 7);

    let version = engine.train(&records, Some(2)).unwrap();
    let report = engine.evaluate(Some(&version)).unwrap();

    assert!(report.valid);
    assert_eq!(report.n_samples, 200);
    assert_eq!(report.n_clusters, 2);
    let silhouette = report.silhouette.unwrap();
    assert!(silhouette > 0.7, "silhouette {silhouette}");
    for size in &report.cluster_sizes {
        assert_eq!(size.members, 100, "cluster {} size", size.cluster_id);
    }
    assert!(report.davies_bouldin.unwrap() < 0.5);

    // Each group lands in exactly one segment
    let assignments = engine.assign(&records, None).unwrap();
    let junior: HashSet<ClusterId> = assignments[..100].iter().map(|a| a.cluster_id).collect();
    let senior: HashSet<ClusterId> = assignments[100..].iter().map(|a| a.cluster_id).collect();
    assert_eq!(junior.len(), 1);
    assert_eq!(senior.len(), 1);
    assert_ne!(junior, senior);
}

#[test]
fn test_automatic_k_prefers_two_groups() {
    let (engine, _dir) = numeric_engine();
    let records = two_group_records(60, 11);

    let version = engine.train(&records, None).unwrap();
    let loaded = engine.registry().load(Some(&version)).unwrap();
    let selection = loaded.model.selection.clone().expect("sweep diagnostics");

    assert_eq!(selection.silhouette_k, 2);
    assert_eq!(selection.candidates.first().map(|p| p.k), Some(2));
    assert_eq!(selection.candidates.last().map(|p| p.k), Some(6));
    assert_eq!(loaded.model.k, selection.chosen_k);
    assert!((2..=6).contains(&loaded.model.k));
}

#[test]
fn test_same_seed_same_model() {
    let records = two_group_records(50, 3);

    let train_once = || {
        let dir = TempDir::new().unwrap();
        let mut settings = numeric_settings(&dir.path().join("models"));
        settings.training.k_max = 5;
        let engine = SegmentationEngine::new(settings).unwrap();
        let version = engine.train(&records, None).unwrap();
        let loaded = engine.registry().load(Some(&version)).unwrap();
        let labels: Vec<ClusterId> = engine
            .assign(&records, None)
            .unwrap()
            .into_iter()
            .map(|a| a.cluster_id)
            .collect();
        (loaded.model.clone(), loaded.schema.layout.clone(), labels)
    };

    let (first, first_layout, first_labels) = train_once();
    let (second, second_layout, second_labels) = train_once();

    assert_eq!(first.k, second.k);
    assert_eq!(first.centroids, second.centroids);
    assert_eq!(first.inertia, second.inertia);
    assert_eq!(first.cluster_sizes, second.cluster_sizes);
    assert_eq!(first.selection, second.selection);
    assert_eq!(first_layout, second_layout);
    assert_eq!(first_labels, second_labels);
}
