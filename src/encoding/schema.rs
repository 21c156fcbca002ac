//! The fitted encoding schema and its reverse feature map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::categorical::CategoryVocabulary;
use super::numeric::NumericStats;
use super::text::TfidfVocabulary;
use crate::error::{SegmentError, SegmentResult};
use crate::record::{CandidateRecord, FieldKind};
use crate::types::{EncodedVector, VectorDimension};

/// Current schema format version.
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericField {
    pub name: String,
    pub stats: NumericStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalField {
    pub name: String,
    pub vocabulary: CategoryVocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextField {
    pub name: String,
    pub vocabulary: TfidfVocabulary,
}

/// Field layout of the encoded vector: `[numeric | categorical | text]`,
/// each block in configured field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaLayout {
    pub unknown_category: String,
    pub numeric: Vec<NumericField>,
    pub categorical: Vec<CategoricalField>,
    pub text: Vec<TextField>,
}

/// Frozen shape of the feature encoder, produced once per training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSchema {
    pub format_version: u32,
    pub layout: SchemaLayout,
    pub fitted_at: DateTime<Utc>,
    pub record_count: usize,
}

/// Where one encoded dimension came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOrigin {
    /// Source field name in the candidate record
    pub field: String,
    pub kind: FieldKind,
    /// Human-readable feature label, e.g. `location=Berlin` or `skills:rust`
    pub label: String,
}

impl EncodingSchema {
    pub(crate) fn new(layout: SchemaLayout, record_count: usize) -> Self {
        Self {
            format_version: SCHEMA_FORMAT_VERSION,
            layout,
            fitted_at: Utc::now(),
            record_count,
        }
    }

    /// Encoded vector width.
    #[must_use]
    pub fn width(&self) -> usize {
        self.layout.numeric.len()
            + self
                .layout
                .categorical
                .iter()
                .map(|f| f.vocabulary.width())
                .sum::<usize>()
            + self
                .layout
                .text
                .iter()
                .map(|f| f.vocabulary.width())
                .sum::<usize>()
    }

    pub fn dimension(&self) -> SegmentResult<VectorDimension> {
        VectorDimension::new(self.width())
    }

    /// Field names a record must carry, in encoding order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.layout
            .numeric
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.layout.categorical.iter().map(|f| f.name.as_str()))
            .chain(self.layout.text.iter().map(|f| f.name.as_str()))
    }

    /// SHA-256 over the layout. Fit timestamps are excluded, so two fits on
    /// the same data share a fingerprint.
    pub fn fingerprint(&self) -> SegmentResult<String> {
        let canonical = serde_json::to_vec(&self.layout)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Maps an encoded dimension back to its source field.
    #[must_use]
    pub fn feature_origin(&self, dim: usize) -> Option<FeatureOrigin> {
        let mut offset = 0;

        for field in &self.layout.numeric {
            if dim == offset {
                return Some(FeatureOrigin {
                    field: field.name.clone(),
                    kind: FieldKind::Numeric,
                    label: field.name.clone(),
                });
            }
            offset += 1;
        }

        for field in &self.layout.categorical {
            let width = field.vocabulary.width();
            if dim < offset + width {
                let category = &field.vocabulary.categories[dim - offset];
                return Some(FeatureOrigin {
                    field: field.name.clone(),
                    kind: FieldKind::Categorical,
                    label: format!("{}={category}", field.name),
                });
            }
            offset += width;
        }

        for field in &self.layout.text {
            let width = field.vocabulary.width();
            if dim < offset + width {
                let term = &field.vocabulary.terms[dim - offset];
                return Some(FeatureOrigin {
                    field: field.name.clone(),
                    kind: FieldKind::Text,
                    label: format!("{}:{term}", field.name),
                });
            }
            offset += width;
        }

        None
    }

    /// Labels for every encoded dimension, in order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        (0..self.width())
            .filter_map(|dim| self.feature_origin(dim).map(|o| o.label))
            .collect()
    }

    /// Encodes one record against the frozen schema.
    ///
    /// Fails with `SchemaMismatch` if a required field is absent; null values
    /// are imputed and unseen categories leave their block all-zero.
    pub fn encode(&self, record: &CandidateRecord) -> SegmentResult<EncodedVector> {
        let mut values = Vec::with_capacity(self.width());

        for field in &self.layout.numeric {
            let value = record.numeric_value(&field.name)?;
            values.push(field.stats.transform(value));
        }

        for field in &self.layout.categorical {
            let value = record.categorical_value(&field.name)?;
            let seen = field.vocabulary.encode_into(
                value.as_deref(),
                &self.layout.unknown_category,
                &mut values,
            );
            if !seen {
                tracing::debug!(
                    candidate = %record.id,
                    field = %field.name,
                    "unseen category encoded as all-zero block"
                );
            }
        }

        for field in &self.layout.text {
            let value = record.text_value(&field.name)?;
            field.vocabulary.encode_into(value.as_deref(), &mut values);
        }

        if values.len() != self.width() {
            return Err(SegmentError::DimensionMismatch {
                expected: self.width(),
                actual: values.len(),
            });
        }

        Ok(EncodedVector::from_values(values))
    }

    /// Encodes every record; fails on the first invalid record.
    pub fn encode_all(&self, records: &[CandidateRecord]) -> SegmentResult<Vec<EncodedVector>> {
        records.iter().map(|r| self.encode(r)).collect()
    }
}
