//! Fits the encoding schema over a training extract.

use crate::config::EncoderConfig;
use crate::error::{SegmentError, SegmentResult};
use crate::record::{CandidateRecord, FieldKind};
use crate::types::EncodedVector;

use super::categorical::CategoryVocabulary;
use super::numeric::NumericStats;
use super::schema::{CategoricalField, EncodingSchema, NumericField, SchemaLayout, TextField};
use super::text::TfidfVocabulary;

/// Turns candidate records into fixed-width numeric vectors.
///
/// The encoder itself is stateless; [`FeatureEncoder::fit`] produces an
/// [`EncodingSchema`] that is frozen for the lifetime of a model version.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> SegmentResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Learns imputation values, scaling, category vocabularies and text
    /// vocabularies from `records`.
    pub fn fit(&self, records: &[CandidateRecord]) -> SegmentResult<EncodingSchema> {
        if records.len() < self.config.min_records {
            return Err(SegmentError::InsufficientData {
                what: "records",
                required: self.config.min_records,
                actual: records.len(),
            });
        }

        let unknown = self.config.unknown_category.as_str();

        let numeric = self
            .config
            .fields_of(FieldKind::Numeric)
            .map(|spec| {
                let column = records
                    .iter()
                    .map(|r| r.numeric_value(&spec.name))
                    .collect::<SegmentResult<Vec<_>>>()?;
                Ok(NumericField {
                    name: spec.name.clone(),
                    stats: NumericStats::fit(&column),
                })
            })
            .collect::<SegmentResult<Vec<_>>>()?;

        let categorical = self
            .config
            .fields_of(FieldKind::Categorical)
            .map(|spec| {
                let column = records
                    .iter()
                    .map(|r| r.categorical_value(&spec.name))
                    .collect::<SegmentResult<Vec<_>>>()?;
                Ok(CategoricalField {
                    name: spec.name.clone(),
                    vocabulary: CategoryVocabulary::fit(&column, unknown),
                })
            })
            .collect::<SegmentResult<Vec<_>>>()?;

        let text = self
            .config
            .fields_of(FieldKind::Text)
            .map(|spec| {
                let column = records
                    .iter()
                    .map(|r| r.text_value(&spec.name))
                    .collect::<SegmentResult<Vec<_>>>()?;
                Ok(TextField {
                    name: spec.name.clone(),
                    vocabulary: TfidfVocabulary::fit(&column, self.config.max_text_features),
                })
            })
            .collect::<SegmentResult<Vec<_>>>()?;

        let schema = EncodingSchema::new(
            SchemaLayout {
                unknown_category: self.config.unknown_category.clone(),
                numeric,
                categorical,
                text,
            },
            records.len(),
        );

        if schema.width() == 0 {
            return Err(SegmentError::InsufficientData {
                what: "encoded features",
                required: 1,
                actual: 0,
            });
        }

        tracing::debug!(
            records = records.len(),
            width = schema.width(),
            "fitted encoding schema"
        );

        Ok(schema)
    }

    /// Encodes records against an existing schema.
    pub fn transform(
        &self,
        schema: &EncodingSchema,
        records: &[CandidateRecord],
    ) -> SegmentResult<Vec<EncodedVector>> {
        schema.encode_all(records)
    }

    pub fn fit_transform(
        &self,
        records: &[CandidateRecord],
    ) -> SegmentResult<(EncodingSchema, Vec<EncodedVector>)> {
        let schema = self.fit(records)?;
        let vectors = schema.encode_all(records)?;
        Ok((schema, vectors))
    }
}
