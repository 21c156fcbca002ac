//! Type-safe wrappers and core value types shared across the engine.
//!
//! Identifiers are newtypes so a candidate id can never be passed where a
//! cluster id is expected, and encoded vectors carry their own dimension.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{SegmentError, SegmentResult};

/// Identifier of a candidate profile, owned by the external data store.
///
/// Extracts may key candidates by string or by integer primary key; an
/// integer id is kept as its decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl<'de> Deserialize<'de> for CandidateId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Unsigned(id) => Self(id.to_string()),
            RawId::Signed(id) => Self(id.to_string()),
        })
    }
}

impl CandidateId {
    /// Creates a new `CandidateId`.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Type-safe wrapper for segment (cluster) ids.
///
/// Clusters are identified by non-zero ids: a model with `k` segments
/// produces ids `1..=k`, and centroid `i` (0-based) belongs to id `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(NonZeroU32);

impl ClusterId {
    /// Creates a new `ClusterId` from a non-zero u32.
    ///
    /// Returns `None` if the provided ID is zero.
    #[must_use]
    pub fn new(id: u32) -> Option<Self> {
        NonZeroU32::new(id).map(Self)
    }

    /// Creates the id of the centroid at 0-based position `index`.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index as u32))
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Returns the 0-based centroid position for this id.
    #[must_use]
    pub fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one committed (schema, model) pair in the registry.
///
/// Ids are derived from the commit timestamp (`v20261018T101500123Z`) so
/// lexical order equals commit order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Wraps an existing version string, rejecting values that could escape
    /// the registry directory.
    pub fn parse(value: impl Into<String>) -> SegmentResult<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(SegmentError::VersionNotFound { version: value });
        }
        Ok(Self(value))
    }

    /// Builds a version id from a UTC timestamp and a collision counter.
    #[must_use]
    pub fn from_timestamp(at: chrono::DateTime<chrono::Utc>, sequence: u32) -> Self {
        let stamp = at.format("%Y%m%dT%H%M%S%3fZ");
        if sequence == 0 {
            Self(format!("v{stamp}"))
        } else {
            Self(format!("v{stamp}-{sequence}"))
        }
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for VersionId {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent dimension
/// mismatches between a schema, its vectors and a model's centroids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> SegmentResult<Self> {
        if dim == 0 {
            return Err(SegmentError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f64]) -> SegmentResult<()> {
        if vector.len() != self.0 {
            return Err(SegmentError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Fixed-length numeric encoding of one candidate record.
///
/// Only the encoder constructs these from records; the length always
/// equals the producing schema's width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedVector(Vec<f64>);

impl EncodedVector {
    /// Wraps raw values. Used by the encoder and by callers that already
    /// hold vectors from a previous encoding (e.g. a training snapshot).
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Returns the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of encoded dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the vector has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the vector and returns its values.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl AsRef<[f64]> for EncodedVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

/// One (candidate, segment) pair produced by assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub candidate_id: CandidateId,
    pub cluster_id: ClusterId,
}
