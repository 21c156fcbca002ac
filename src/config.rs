//! Configuration module for the segmentation engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SEG_` and use double underscores
//! to separate nested levels:
//! - `SEG_TRAINING__K_MAX=12` sets `training.k_max`
//! - `SEG_ENCODER__MIN_RECORDS=50` sets `encoder.min_records`
//! - `SEG_REGISTRY__ON_CONCURRENT_TRAINING=queue` sets `registry.on_concurrent_training`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{SegmentError, SegmentResult};
use crate::record::{FieldKind, FieldSpec, default_fields};
use crate::registry::ConcurrencyPolicy;

/// Directory holding the settings file and, by default, the model registry.
pub const CONFIG_DIR: &str = ".segmenta";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Base path of the model registry
    #[serde(default = "default_registry_path")]
    pub registry_path: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    /// Feature encoder settings
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Cluster training settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Model registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Evaluation settings
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Interpretation settings
    #[serde(default)]
    pub interpretation: InterpretationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EncoderConfig {
    /// Minimum number of records `fit` accepts
    #[serde(default = "default_min_records")]
    pub min_records: usize,

    /// Vocabulary size of each text field (top-N terms by corpus frequency)
    #[serde(default = "default_max_text_features")]
    pub max_text_features: usize,

    /// Reserved category used for missing categorical values
    #[serde(default = "default_unknown_category")]
    pub unknown_category: String,

    /// Ordered encoder input fields
    #[serde(default = "default_fields")]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrainingConfig {
    /// Seed for centroid seeding and restarts
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Independent k-means restarts; the lowest-inertia run wins
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Iteration cap per restart
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Relative centroid-shift tolerance for convergence
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Smallest k tried by automatic selection
    #[serde(default = "default_k_min")]
    pub k_min: usize,

    /// Largest k tried by automatic selection
    #[serde(default = "default_k_max")]
    pub k_max: usize,

    /// Fit the candidate k values on the rayon pool
    #[serde(default = "default_true")]
    pub parallel_sweep: bool,

    /// Worker threads for the sweep (0 = rayon default)
    #[serde(default)]
    pub threads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RegistryConfig {
    /// What a second training commit does while one is in flight
    #[serde(default)]
    pub on_concurrent_training: ConcurrencyPolicy,

    /// Store training vectors with each version for later evaluation
    #[serde(default = "default_true")]
    pub keep_training_snapshot: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EvaluationConfig {
    /// Silhouette is computed on a seeded sample above this size (0 = never sample)
    #[serde(default = "default_silhouette_sample_size")]
    pub silhouette_sample_size: usize,

    /// Seed for the silhouette sample
    #[serde(default = "default_seed")]
    pub sample_seed: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InterpretationConfig {
    /// Descriptors reported per segment
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_registry_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("models")
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_min_records() -> usize {
    10
}
fn default_max_text_features() -> usize {
    100
}
fn default_unknown_category() -> String {
    "__unknown__".to_string()
}
fn default_seed() -> u64 {
    42
}
fn default_n_init() -> usize {
    10
}
fn default_max_iterations() -> usize {
    300
}
fn default_tolerance() -> f64 {
    1e-4
}
fn default_k_min() -> usize {
    2
}
fn default_k_max() -> usize {
    20
}
fn default_silhouette_sample_size() -> usize {
    5_000
}
fn default_top_n() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            registry_path: default_registry_path(),
            debug: false,
            encoder: EncoderConfig::default(),
            training: TrainingConfig::default(),
            registry: RegistryConfig::default(),
            evaluation: EvaluationConfig::default(),
            interpretation: InterpretationConfig::default(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            min_records: default_min_records(),
            max_text_features: default_max_text_features(),
            unknown_category: default_unknown_category(),
            fields: default_fields(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            n_init: default_n_init(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            k_min: default_k_min(),
            k_max: default_k_max(),
            parallel_sweep: true,
            threads: 0,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            on_concurrent_training: ConcurrencyPolicy::default(),
            keep_training_snapshot: true,
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            silhouette_sample_size: default_silhouette_sample_size(),
            sample_seed: default_seed(),
        }
    }
}

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

impl EncoderConfig {
    /// Checks the field list: non-empty, unique names.
    pub fn validate(&self) -> SegmentResult<()> {
        if self.fields.is_empty() {
            return Err(SegmentError::Config {
                reason: "encoder.fields must name at least one field".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SegmentError::Config {
                    reason: "encoder field names cannot be empty".to_string(),
                });
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SegmentError::Config {
                    reason: format!("encoder field '{}' is listed twice", field.name),
                });
            }
        }
        if self.min_records < 2 {
            return Err(SegmentError::Config {
                reason: "encoder.min_records must be at least 2".to_string(),
            });
        }
        Ok(())
    }

    /// Fields of one kind, in configured order.
    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| f.kind == kind)
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> SegmentResult<()> {
        let reason = if self.k_min < 2 {
            Some("training.k_min must be at least 2".to_string())
        } else if self.k_max < self.k_min {
            Some(format!(
                "training.k_max ({}) must be >= training.k_min ({})",
                self.k_max, self.k_min
            ))
        } else if self.n_init == 0 {
            Some("training.n_init must be at least 1".to_string())
        } else if self.max_iterations == 0 {
            Some("training.max_iterations must be at least 1".to_string())
        } else if !(self.tolerance >= 0.0) {
            Some("training.tolerance must be a non-negative number".to_string())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(SegmentError::Config { reason }),
            None => Ok(()),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .segmenta directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("settings.toml"));

        Self::figment(config_path).extract().map_err(Box::new)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Layer in environment variables with SEG_ prefix
            // Use double underscore (__) to separate nested levels
            .merge(Env::prefixed("SEG_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Validates every section.
    pub fn validate(&self) -> SegmentResult<()> {
        self.encoder.validate()?;
        self.training.validate()?;
        if self.interpretation.top_n == 0 {
            return Err(SegmentError::Config {
                reason: "interpretation.top_n must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Find the settings file by looking for a .segmenta directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join("settings.toml"));
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = r#"# Segmenta Configuration File

# Version of the configuration schema
version = 1

# Model registry location (relative to the working directory)
registry_path = ".segmenta/models"

# Global debug mode
debug = false

[encoder]
# fit() refuses fewer records than this
min_records = 10

# Vocabulary size for each text field (top terms by corpus frequency)
max_text_features = 100

# Category used for missing categorical values
unknown_category = "__unknown__"

# Encoder input fields, in encoding order within each block.
# kind: "numeric" | "categorical" | "text"
fields = [
  { name = "years_experience", kind = "numeric" },
  { name = "desired_salary", kind = "numeric" },
  { name = "location", kind = "categorical" },
  { name = "education_level", kind = "categorical" },
  { name = "skills", kind = "text" },
]

[training]
seed = 42
# k-means restarts; the lowest-inertia run is kept
n_init = 10
max_iterations = 300
tolerance = 1e-4
# Range searched when no k is given
k_min = 2
k_max = 20
# Fit candidate k values in parallel
parallel_sweep = true
# Worker threads (0 = one per CPU)
threads = 0

[registry]
# "reject" fails a second concurrent training, "queue" waits for the first
on_concurrent_training = "reject"
# Keep training vectors with each version for `segmenta evaluate`
keep_training_snapshot = true

[evaluation]
# Silhouette uses a seeded sample above this many vectors (0 = never)
silhouette_sample_size = 5000
sample_seed = 42

[interpretation]
top_n = 5
"#;

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}
