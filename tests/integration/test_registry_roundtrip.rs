//! Test: registry persistence
//!
//! A committed (schema, model) pair reloads equal from a fresh registry
//! handle, encodes records identically, and keeps its dimensions paired.

use crate::common::{profile_records, profile_settings};
use segmenta::registry::{LATEST_FILE, MODEL_FILE, VERSIONS_DIR};
use segmenta::{ModelRegistry, SegmentError, SegmentationEngine};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_version_reloads_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let settings = profile_settings(&temp_dir.path().join("models"));
    let records = profile_records(30, 5);

    let engine = SegmentationEngine::new(settings.clone()).unwrap();
    let version = engine.train(&records, Some(2)).unwrap();
    let original = engine.registry().load(Some(&version)).unwrap();

    // Fresh handle, nothing cached
    let registry = ModelRegistry::from_settings(&settings);
    assert_eq!(registry.latest().unwrap(), version);
    let reloaded = registry.load(None).unwrap();

    assert_eq!(reloaded.schema, original.schema);
    assert_eq!(reloaded.model, original.model);
    assert_eq!(reloaded.manifest.k, 2);
    assert!(reloaded.manifest.has_snapshot());

    // Schema stability: the reloaded schema encodes exactly as before
    for record in &records {
        let before = original.schema.encode(record).unwrap();
        let after = reloaded.schema.encode(record).unwrap();
        assert_eq!(before.as_slice(), after.as_slice());
    }
}

#[test]
fn test_dimensions_stay_paired() {
    let temp_dir = TempDir::new().unwrap();
    let settings = profile_settings(&temp_dir.path().join("models"));
    let records = profile_records(25, 9);

    let engine = SegmentationEngine::new(settings).unwrap();
    engine.train(&records, None).unwrap();
    let loaded = engine.registry().load(None).unwrap();

    let width = loaded.schema.width();
    assert_eq!(loaded.model.dimension().unwrap().get(), width);
    for centroid in &loaded.model.centroids {
        assert_eq!(centroid.len(), width);
    }
    for vector in loaded.schema.encode_all(&records).unwrap() {
        assert_eq!(vector.len(), width);
    }
    assert_eq!(loaded.model.schema_fingerprint, loaded.schema.fingerprint().unwrap());
}

#[test]
fn test_retraining_moves_latest() {
    let temp_dir = TempDir::new().unwrap();
    let settings = profile_settings(&temp_dir.path().join("models"));
    let engine = SegmentationEngine::new(settings).unwrap();

    let first = engine.train(&profile_records(20, 1), Some(2)).unwrap();
    let second = engine.train(&profile_records(20, 2), Some(3)).unwrap();

    assert!(first < second);
    assert_eq!(engine.latest().unwrap(), second);
    assert_eq!(engine.registry().load(None).unwrap().model.k, 3);
    // The earlier version stays loadable
    assert_eq!(engine.registry().load(Some(&first)).unwrap().model.k, 2);

    let versions: Vec<_> = engine
        .versions()
        .unwrap()
        .into_iter()
        .map(|m| m.version)
        .collect();
    assert_eq!(versions, vec![first, second]);
}

#[test]
fn test_tampered_model_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("models");
    let settings = profile_settings(&base);
    let engine = SegmentationEngine::new(settings.clone()).unwrap();
    let version = engine.train(&profile_records(20, 4), Some(2)).unwrap();

    let model_path = base.join(VERSIONS_DIR).join(version.as_str()).join(MODEL_FILE);
    let mut content = fs::read_to_string(&model_path).unwrap();
    content.push(' ');
    fs::write(&model_path, content).unwrap();

    let registry = ModelRegistry::from_settings(&settings);
    assert!(matches!(
        registry.load(Some(&version)),
        Err(SegmentError::RegistryCorrupted { .. })
    ));
    assert!(base.join(LATEST_FILE).exists());
}

#[test]
fn test_empty_registry_has_no_model() {
    let temp_dir = TempDir::new().unwrap();
    let settings = profile_settings(&temp_dir.path().join("models"));
    let engine = SegmentationEngine::new(settings).unwrap();

    assert!(matches!(
        engine.evaluate(None),
        Err(SegmentError::ModelNotTrained { .. })
    ));
    assert!(matches!(
        engine.assign(&profile_records(2, 1), None),
        Err(SegmentError::ModelNotTrained { .. })
    ));
    assert!(engine.versions().unwrap().is_empty());
}
