//! On-disk layout of the model registry.
//!
//! ```text
//! <base>/
//!   LATEST                  id of the newest committed version
//!   versions/<id>/
//!     manifest.json         version metadata + per-file SHA-256
//!     schema.json
//!     model.json
//!     snapshot.json         optional training vectors and labels
//!   .staging/<id>.<pid>/    in-progress commits, renamed into versions/
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SegmentError, SegmentResult};
use crate::types::{CandidateId, ClusterId, EncodedVector, VersionId};

pub const LATEST_FILE: &str = "LATEST";
pub const VERSIONS_DIR: &str = "versions";
pub const STAGING_DIR: &str = ".staging";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const SCHEMA_FILE: &str = "schema.json";
pub const MODEL_FILE: &str = "model.json";
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Current manifest format version.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Checksum of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub name: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Metadata of one committed version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub format_version: u32,
    pub version: VersionId,
    pub saved_at: DateTime<Utc>,
    pub k: usize,
    pub schema_fingerprint: String,
    pub training_size: usize,
    pub files: Vec<FileDigest>,
}

impl VersionManifest {
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.files.iter().any(|f| f.name == SNAPSHOT_FILE)
    }

    fn digest(&self, name: &str) -> Option<&FileDigest> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Training vectors kept with a version so it can be evaluated and
/// interpreted without the caller re-supplying data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSnapshot {
    pub candidate_ids: Vec<CandidateId>,
    pub vectors: Vec<EncodedVector>,
    pub labels: Vec<ClusterId>,
}

impl TrainingSnapshot {
    pub fn validate(&self) -> SegmentResult<()> {
        let n = self.vectors.len();
        if self.candidate_ids.len() != n || self.labels.len() != n {
            return Err(SegmentError::InsufficientData {
                what: "snapshot rows",
                required: n,
                actual: self.candidate_ids.len().min(self.labels.len()),
            });
        }
        Ok(())
    }

    /// Labels as the optional form the evaluator and interpreter take.
    #[must_use]
    pub fn optional_labels(&self) -> Vec<Option<ClusterId>> {
        self.labels.iter().copied().map(Some).collect()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serializes `value` to `dir/name` and returns its digest.
pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> SegmentResult<FileDigest> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let path = dir.join(name);
    write_synced(&path, &bytes)?;
    Ok(FileDigest {
        name: name.to_string(),
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

/// Writes and fsyncs a file.
pub fn write_synced(path: &Path, bytes: &[u8]) -> SegmentResult<()> {
    let mut file = File::create(path).map_err(|e| SegmentError::io(path, e))?;
    file.write_all(bytes).map_err(|e| SegmentError::io(path, e))?;
    file.sync_all().map_err(|e| SegmentError::io(path, e))
}

/// Replaces `path` atomically with `contents` (temp file + rename).
pub fn write_atomic(path: &Path, contents: &[u8]) -> SegmentResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| SegmentError::io(parent, e))?;
    tmp.write_all(contents).map_err(|e| SegmentError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SegmentError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| SegmentError::io(path, e.error))?;
    Ok(())
}

/// Reads `dir/name`, verifying it against the manifest digest.
pub fn read_verified<T: DeserializeOwned>(
    dir: &Path,
    manifest: &VersionManifest,
    name: &str,
) -> SegmentResult<T> {
    let path = dir.join(name);
    let digest = manifest
        .digest(name)
        .ok_or_else(|| SegmentError::RegistryCorrupted {
            path: path.clone(),
            reason: format!("manifest does not list {name}"),
        })?;

    let bytes = fs::read(&path).map_err(|e| SegmentError::io(&path, e))?;
    let actual = sha256_hex(&bytes);
    if actual != digest.sha256 {
        return Err(SegmentError::RegistryCorrupted {
            path,
            reason: format!("checksum mismatch: expected {}, got {actual}", digest.sha256),
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| SegmentError::RegistryCorrupted {
        path,
        reason: e.to_string(),
    })
}

pub fn read_manifest(dir: &Path) -> SegmentResult<VersionManifest> {
    let path = dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|e| SegmentError::io(&path, e))?;
    let manifest: VersionManifest =
        serde_json::from_slice(&bytes).map_err(|e| SegmentError::RegistryCorrupted {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    if manifest.format_version != MANIFEST_FORMAT_VERSION {
        return Err(SegmentError::RegistryCorrupted {
            path,
            reason: format!(
                "unsupported manifest format {} (expected {MANIFEST_FORMAT_VERSION})",
                manifest.format_version
            ),
        });
    }
    Ok(manifest)
}

/// Ordering key for version ids: timestamp part, then numeric suffix.
pub fn version_sort_key(version: &VersionId) -> (String, u32) {
    let id = version.as_str();
    match id.rsplit_once('-') {
        Some((stamp, seq)) if seq.chars().all(|c| c.is_ascii_digit()) => {
            (stamp.to_string(), seq.parse().unwrap_or(0))
        }
        _ => (id.to_string(), 0),
    }
}

/// A staging directory that is removed unless committed.
pub struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    pub fn create(base: &Path, version: &VersionId) -> SegmentResult<Self> {
        let root = base.join(STAGING_DIR);
        fs::create_dir_all(&root).map_err(|e| SegmentError::io(&root, e))?;
        let path = root.join(format!("{version}.{}", std::process::id()));
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| SegmentError::io(&path, e))?;
        }
        fs::create_dir(&path).map_err(|e| SegmentError::io(&path, e))?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the staging directory to `target`.
    pub fn commit(mut self, target: &Path) -> SegmentResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| SegmentError::io(parent, e))?;
        }
        fs::rename(&self.path, target).map_err(|e| SegmentError::io(target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
