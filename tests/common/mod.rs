#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segmenta::record::{CandidateRecord, FieldSpec};
use segmenta::{SegmentationEngine, Settings};
use std::path::Path;
use tempfile::TempDir;

const LOCATIONS: [&str; 3] = ["Berlin", "Paris", "Madrid"];
const EDUCATION: [&str; 3] = ["bachelor", "master", "phd"];
const SKILLS_JUNIOR: [&str; 4] = ["html", "css", "javascript", "support"];
const SKILLS_SENIOR: [&str; 4] = ["rust", "kubernetes", "architecture", "leadership"];

/// Standard normal draw via Box-Muller.
pub fn gaussian(rng: &mut StdRng, mean: f64, sd: f64) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + sd * z
}

/// Two well separated groups over `years_experience` and `desired_salary`.
/// The first `per_group` records are juniors, the rest seniors.
pub fn two_group_records(per_group: usize, seed: u64) -> Vec<CandidateRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(per_group * 2);
    for i in 0..per_group {
        records.push(
            CandidateRecord::new(format!("junior-{i}"))
                .with_number("years_experience", gaussian(&mut rng, 2.0, 0.5))
                .with_number("desired_salary", gaussian(&mut rng, 40_000.0, 2_000.0)),
        );
    }
    for i in 0..per_group {
        records.push(
            CandidateRecord::new(format!("senior-{i}"))
                .with_number("years_experience", gaussian(&mut rng, 12.0, 0.5))
                .with_number("desired_salary", gaussian(&mut rng, 90_000.0, 2_000.0)),
        );
    }
    records
}

/// Full candidate profiles using every default field, in two personas.
pub fn profile_records(per_group: usize, seed: u64) -> Vec<CandidateRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(per_group * 2);
    for i in 0..per_group * 2 {
        let senior = i >= per_group;
        let (years, salary, skills) = if senior {
            (12.0, 95_000.0, SKILLS_SENIOR)
        } else {
            (1.5, 38_000.0, SKILLS_JUNIOR)
        };
        let picked: Vec<&str> = skills
            .iter()
            .copied()
            .filter(|_| rng.random_bool(0.75))
            .collect();
        records.push(
            CandidateRecord::new(format!("cand-{i}"))
                .with_number("years_experience", gaussian(&mut rng, years, 1.0))
                .with_number("desired_salary", gaussian(&mut rng, salary, 3_000.0))
                .with_category("location", LOCATIONS[rng.random_range(0..LOCATIONS.len())])
                .with_category(
                    "education_level",
                    EDUCATION[if senior { 2 } else { rng.random_range(0..2) }],
                )
                .with_tags("skills", picked),
        );
    }
    records
}

/// Settings with an isolated registry and the two numeric fields only.
pub fn numeric_settings(registry: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.registry_path = registry.to_path_buf();
    settings.encoder.fields = vec![
        FieldSpec::numeric("years_experience"),
        FieldSpec::numeric("desired_salary"),
    ];
    settings.training.k_max = 6;
    settings
}

/// Settings with an isolated registry and the default profile fields.
pub fn profile_settings(registry: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.registry_path = registry.to_path_buf();
    settings.training.k_max = 6;
    settings
}

/// Creates an engine over a fresh temporary registry.
pub fn numeric_engine() -> (SegmentationEngine, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = numeric_settings(&temp_dir.path().join("models"));
    let engine = SegmentationEngine::new(settings).expect("valid settings");
    (engine, temp_dir)
}
