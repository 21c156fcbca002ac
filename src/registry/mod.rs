//! Versioned persistence of (schema, model) pairs.
//!
//! Each commit is written to a staging directory and renamed into
//! `versions/<id>` in one step, then the `LATEST` pointer is replaced
//! atomically. Readers therefore never see a half-written pair. Loaded
//! versions are immutable and shared through `Arc`; the registry caches the
//! most recent one.
//!
//! Training exclusivity is enforced within one process through the
//! training slot ([`ModelRegistry::begin_training`]). Separate processes
//! sharing a registry directory are not coordinated.

mod store;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};

use crate::assignment::ensure_paired;
use crate::clustering::ClusterModel;
use crate::config::{RegistryConfig, Settings};
use crate::encoding::EncodingSchema;
use crate::error::{SegmentError, SegmentResult};
use crate::types::VersionId;

pub use store::{
    FileDigest, LATEST_FILE, MANIFEST_FILE, MODEL_FILE, SCHEMA_FILE, SNAPSHOT_FILE,
    TrainingSnapshot, VERSIONS_DIR, VersionManifest,
};
use store::{
    MANIFEST_FORMAT_VERSION, StagingDir, read_manifest, read_verified, version_sort_key,
    write_atomic, write_json,
};

/// What happens when a training commit is requested while another one is
/// in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyPolicy {
    /// Fail immediately with `ConcurrentTraining`
    #[default]
    Reject,
    /// Block until the running training releases the slot
    Queue,
}

/// An immutable, loaded (schema, model) pair.
#[derive(Debug, Clone)]
pub struct LoadedVersion {
    pub version: VersionId,
    pub manifest: VersionManifest,
    pub schema: EncodingSchema,
    pub model: ClusterModel,
}

/// Filesystem-backed model registry.
#[derive(Debug)]
pub struct ModelRegistry {
    base: PathBuf,
    policy: ConcurrencyPolicy,
    keep_snapshot: bool,
    training: Mutex<()>,
    current: RwLock<Option<Arc<LoadedVersion>>>,
}

/// Exclusive right to commit one training result.
///
/// Dropping the guard without committing releases the slot.
pub struct TrainingGuard<'a> {
    registry: &'a ModelRegistry,
    _slot: MutexGuard<'a, ()>,
}

impl ModelRegistry {
    pub fn new(base: impl AsRef<Path>, config: &RegistryConfig) -> Self {
        Self {
            base: base.as_ref().to_path_buf(),
            policy: config.on_concurrent_training,
            keep_snapshot: config.keep_training_snapshot,
            training: Mutex::new(()),
            current: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.registry_path, &settings.registry)
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    fn versions_dir(&self) -> PathBuf {
        self.base.join(VERSIONS_DIR)
    }

    fn version_dir(&self, version: &VersionId) -> PathBuf {
        self.versions_dir().join(version.as_str())
    }

    /// Claims the training slot according to the configured policy.
    pub fn begin_training(&self) -> SegmentResult<TrainingGuard<'_>> {
        let slot = match self.policy {
            ConcurrencyPolicy::Reject => {
                self.training
                    .try_lock()
                    .ok_or_else(|| SegmentError::ConcurrentTraining {
                        path: self.base.clone(),
                    })?
            }
            ConcurrencyPolicy::Queue => {
                if let Some(slot) = self.training.try_lock() {
                    slot
                } else {
                    tracing::info!("training slot busy, waiting");
                    self.training.lock()
                }
            }
        };
        Ok(TrainingGuard {
            registry: self,
            _slot: slot,
        })
    }

    /// Persists a pair as a new version and makes it the latest.
    pub fn save(&self, schema: &EncodingSchema, model: &ClusterModel) -> SegmentResult<VersionId> {
        self.begin_training()?.commit(schema, model, None)
    }

    fn write_version(
        &self,
        schema: &EncodingSchema,
        model: &ClusterModel,
        snapshot: Option<&TrainingSnapshot>,
    ) -> SegmentResult<VersionId> {
        ensure_paired(schema, model)?;
        model.validate()?;

        let saved_at = Utc::now();
        let mut sequence = 0;
        let mut version = VersionId::from_timestamp(saved_at, sequence);
        while self.version_dir(&version).exists() {
            sequence += 1;
            version = VersionId::from_timestamp(saved_at, sequence);
        }

        let staging = StagingDir::create(&self.base, &version)?;
        let mut files = vec![
            write_json(staging.path(), SCHEMA_FILE, schema)?,
            write_json(staging.path(), MODEL_FILE, model)?,
        ];
        if let Some(snapshot) = snapshot.filter(|_| self.keep_snapshot) {
            snapshot.validate()?;
            files.push(write_json(staging.path(), SNAPSHOT_FILE, snapshot)?);
        }

        let manifest = VersionManifest {
            format_version: MANIFEST_FORMAT_VERSION,
            version: version.clone(),
            saved_at,
            k: model.k,
            schema_fingerprint: model.schema_fingerprint.clone(),
            training_size: model.training_size,
            files,
        };
        write_json(staging.path(), MANIFEST_FILE, &manifest)?;

        staging.commit(&self.version_dir(&version))?;
        write_atomic(&self.base.join(LATEST_FILE), version.as_str().as_bytes())?;

        let loaded = Arc::new(LoadedVersion {
            version: version.clone(),
            manifest,
            schema: schema.clone(),
            model: model.clone(),
        });
        *self.current.write() = Some(loaded);

        tracing::info!(version = %version, k = model.k, "committed model version");
        Ok(version)
    }

    /// Id of the newest committed version.
    ///
    /// Reads the `LATEST` pointer; when it is missing, falls back to the
    /// newest version directory with a manifest.
    pub fn latest(&self) -> SegmentResult<VersionId> {
        let pointer = self.base.join(LATEST_FILE);
        match fs::read_to_string(&pointer) {
            Ok(content) => {
                let version = VersionId::parse(content.trim()).map_err(|_| {
                    SegmentError::RegistryCorrupted {
                        path: pointer.clone(),
                        reason: format!("invalid version id '{}'", content.trim()),
                    }
                })?;
                if !self.version_dir(&version).is_dir() {
                    return Err(SegmentError::RegistryCorrupted {
                        path: pointer,
                        reason: format!("points at missing version {version}"),
                    });
                }
                Ok(version)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let newest = self.committed_versions()?.pop();
                newest.ok_or_else(|| SegmentError::ModelNotTrained {
                    path: self.base.clone(),
                })
            }
            Err(e) => Err(SegmentError::io(pointer, e)),
        }
    }

    /// Committed version ids, oldest first.
    fn committed_versions(&self) -> SegmentResult<Vec<VersionId>> {
        let dir = self.versions_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SegmentError::io(dir, e)),
        };

        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SegmentError::io(&dir, e))?;
            let path = entry.path();
            if !path.join(MANIFEST_FILE).is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Ok(version) = VersionId::parse(name) {
                versions.push(version);
            }
        }
        versions.sort_by_key(version_sort_key);
        Ok(versions)
    }

    /// Manifests of all committed versions, oldest first.
    pub fn versions(&self) -> SegmentResult<Vec<VersionManifest>> {
        self.committed_versions()?
            .iter()
            .map(|version| read_manifest(&self.version_dir(version)))
            .collect()
    }

    /// Loads a version, or the latest one when `version` is `None`.
    pub fn load(&self, version: Option<&VersionId>) -> SegmentResult<Arc<LoadedVersion>> {
        let latest = match version {
            Some(_) => None,
            None => Some(self.latest()?),
        };
        let Some(wanted) = version.or(latest.as_ref()) else {
            return Err(SegmentError::ModelNotTrained {
                path: self.base.clone(),
            });
        };

        if let Some(cached) = self.current.read().as_ref() {
            if &cached.version == wanted {
                tracing::debug!(version = %wanted, "registry cache hit");
                return Ok(Arc::clone(cached));
            }
        }

        let loaded = Arc::new(self.read_version(wanted)?);
        if latest.is_some() {
            *self.current.write() = Some(Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    fn read_version(&self, version: &VersionId) -> SegmentResult<LoadedVersion> {
        let dir = self.version_dir(version);
        if !dir.is_dir() {
            return Err(SegmentError::VersionNotFound {
                version: version.to_string(),
            });
        }

        let manifest = read_manifest(&dir)?;
        let schema: EncodingSchema = read_verified(&dir, &manifest, SCHEMA_FILE)?;
        let model: ClusterModel = read_verified(&dir, &manifest, MODEL_FILE)?;

        ensure_paired(&schema, &model).map_err(|e| SegmentError::RegistryCorrupted {
            path: dir.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(version = %version, k = model.k, "loaded model version");

        Ok(LoadedVersion {
            version: version.clone(),
            manifest,
            schema,
            model,
        })
    }

    /// Training snapshot of a version, if one was stored.
    pub fn load_snapshot(&self, version: &VersionId) -> SegmentResult<Option<TrainingSnapshot>> {
        let dir = self.version_dir(version);
        if !dir.is_dir() {
            return Err(SegmentError::VersionNotFound {
                version: version.to_string(),
            });
        }
        let manifest = read_manifest(&dir)?;
        if !manifest.has_snapshot() {
            return Ok(None);
        }
        let snapshot: TrainingSnapshot = read_verified(&dir, &manifest, SNAPSHOT_FILE)?;
        snapshot.validate()?;
        Ok(Some(snapshot))
    }
}

impl TrainingGuard<'_> {
    /// Persists the trained pair (and optional snapshot) and releases the
    /// slot.
    pub fn commit(
        self,
        schema: &EncodingSchema,
        model: &ClusterModel,
        snapshot: Option<&TrainingSnapshot>,
    ) -> SegmentResult<VersionId> {
        self.registry.write_version(schema, model, snapshot)
    }
}
