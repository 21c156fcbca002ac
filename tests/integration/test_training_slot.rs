//! Test: exclusive training and cancellation

use crate::common::{numeric_settings, two_group_records};
use segmenta::registry::ConcurrencyPolicy;
use segmenta::{ModelRegistry, SegmentError, SegmentationEngine};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[test]
fn test_second_training_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let settings = numeric_settings(&temp_dir.path().join("models"));
    let registry = Arc::new(ModelRegistry::from_settings(&settings));
    assert_eq!(registry.policy(), ConcurrencyPolicy::Reject);

    let engine = SegmentationEngine::with_registry(settings, Arc::clone(&registry)).unwrap();
    let records = two_group_records(20, 1);

    let held = registry.begin_training().unwrap();
    assert!(matches!(
        engine.train(&records, Some(2)),
        Err(SegmentError::ConcurrentTraining { .. })
    ));
    drop(held);

    // Slot released: training proceeds and nothing partial was committed
    assert!(engine.versions().unwrap().is_empty());
    engine.train(&records, Some(2)).unwrap();
    assert_eq!(engine.versions().unwrap().len(), 1);
}

#[test]
fn test_queued_training_waits_for_slot() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = numeric_settings(&temp_dir.path().join("models"));
    settings.registry.on_concurrent_training = ConcurrencyPolicy::Queue;
    let registry = Arc::new(ModelRegistry::from_settings(&settings));
    let engine = SegmentationEngine::with_registry(settings, Arc::clone(&registry)).unwrap();
    let records = two_group_records(20, 2);

    let held = registry.begin_training().unwrap();
    std::thread::scope(|scope| {
        let worker = scope.spawn(|| engine.train(&records, Some(2)));
        std::thread::sleep(Duration::from_millis(50));
        assert!(engine.versions().unwrap().is_empty());
        drop(held);
        worker.join().unwrap().unwrap();
    });

    assert_eq!(engine.versions().unwrap().len(), 1);
}

#[test]
fn test_cancelled_sweep_commits_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let settings = numeric_settings(&temp_dir.path().join("models"));
    let engine = SegmentationEngine::new(settings).unwrap();
    let records = two_group_records(20, 3);

    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        engine.train_with_cancel(&records, None, &cancel),
        Err(SegmentError::Cancelled { .. })
    ));
    assert!(engine.versions().unwrap().is_empty());

    // The slot is free again afterwards
    engine.train(&records, None).unwrap();
}
