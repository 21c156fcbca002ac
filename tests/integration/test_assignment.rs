//! Test: assignment, segments and interpretation through the engine

use crate::common::{profile_records, profile_settings};
use segmenta::record::CandidateRecord;
use segmenta::{SegmentError, SegmentationEngine, TemplateNamer};
use std::collections::HashSet;
use tempfile::TempDir;

fn trained_engine(k: usize) -> (SegmentationEngine, Vec<CandidateRecord>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let settings = profile_settings(&temp_dir.path().join("models"));
    let engine = SegmentationEngine::new(settings).unwrap();
    let records = profile_records(40, 21);
    engine.train(&records, Some(k)).unwrap();
    (engine, records, temp_dir)
}

#[test]
fn test_every_record_gets_one_segment() {
    let (engine, records, _dir) = trained_engine(3);
    let loaded = engine.registry().load(None).unwrap();

    let assignments = engine.assign(&records, None).unwrap();
    assert_eq!(assignments.len(), records.len());
    for (assignment, record) in assignments.iter().zip(&records) {
        assert_eq!(assignment.candidate_id, record.id);
        assert!(loaded.model.contains(assignment.cluster_id));
    }

    // Assignment is a pure function of the stored version
    assert_eq!(engine.assign(&records, None).unwrap(), assignments);
}

#[test]
fn test_missing_location_is_rejected() {
    let (engine, _records, _dir) = trained_engine(2);

    let incomplete = CandidateRecord::new("no-location")
        .with_number("years_experience", 4.0)
        .with_number("desired_salary", 50_000.0)
        .with_category("education_level", "master")
        .with_tags("skills", ["rust"]);

    let err = engine.assign(&[incomplete], None).unwrap_err();
    assert!(matches!(
        err,
        SegmentError::SchemaMismatch { ref candidate_id, ref field }
            if candidate_id == "no-location" && field == "location"
    ));
}

#[test]
fn test_unseen_and_null_values_still_assign() {
    let (engine, _records, _dir) = trained_engine(2);

    let newcomer = CandidateRecord::new("newcomer")
        .with_null("years_experience")
        .with_number("desired_salary", 60_000.0)
        .with_category("location", "Tokyo")
        .with_null("education_level")
        .with_text("skills", "cobol fortran");

    let assignments = engine.assign(&[newcomer], None).unwrap();
    assert_eq!(assignments.len(), 1);
}

#[test]
fn test_segments_cover_all_members() {
    let (engine, records, _dir) = trained_engine(2);

    let segments = engine
        .segments(&records, None, &TemplateNamer::default())
        .unwrap();
    assert_eq!(segments.len(), 2);

    let total: usize = segments.iter().map(|s| s.member_count).sum();
    assert_eq!(total, records.len());

    let mut seen = HashSet::new();
    for segment in &segments {
        assert_eq!(segment.members.len(), segment.member_count);
        assert!(segment.name.starts_with(&format!("Segment {}", segment.id)));
        assert!(!segment.description.is_empty());
        for member in &segment.members {
            assert!(seen.insert(member.clone()), "{member} listed twice");
        }
    }
}

#[test]
fn test_interpretation_separates_personas() {
    let (engine, _records, _dir) = trained_engine(2);

    let summaries = engine.interpret(None, Some(3)).unwrap();
    assert_eq!(summaries.len(), 2);

    let total: f64 = summaries.values().map(|s| s.member_percentage).sum();
    assert!((total - 100.0).abs() < 1e-9);

    for summary in summaries.values() {
        assert!(!summary.descriptors.is_empty());
        assert!(summary.descriptors.len() <= 3);
        let magnitudes: Vec<f64> = summary
            .descriptors
            .iter()
            .map(|d| d.deviation.abs())
            .collect();
        assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
    }
}

#[test]
fn test_sample_evaluation_uses_stored_version() {
    let (engine, records, _dir) = trained_engine(2);

    let report = engine.evaluate_sample(&records, None).unwrap();
    assert!(report.valid);
    assert_eq!(report.n_samples, records.len());
    assert_eq!(report.n_clusters, 2);

    // A single candidate cannot form a scoreable partition
    let lonely = engine.evaluate_sample(&records[..1], None).unwrap();
    assert!(!lonely.valid);
    assert!(lonely.silhouette.is_none());
    assert!(lonely.invalid_reason.is_some());
}
