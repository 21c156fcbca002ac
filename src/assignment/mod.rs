//! Assignment of candidates to segments.
//!
//! Records are encoded with the persisted schema (never re-fit) and go to
//! the nearest centroid by Euclidean distance. No randomness is involved:
//! the same (schema, model, record) triple always yields the same id.

use crate::clustering::ClusterModel;
use crate::encoding::EncodingSchema;
use crate::error::{SegmentError, SegmentResult};
use crate::record::CandidateRecord;
use crate::types::{Assignment, EncodedVector};

/// Checks that `schema` and `model` come from the same training run.
pub fn ensure_paired(schema: &EncodingSchema, model: &ClusterModel) -> SegmentResult<()> {
    let fingerprint = schema.fingerprint()?;
    if fingerprint != model.schema_fingerprint {
        return Err(SegmentError::ArtifactMismatch {
            expected: model.schema_fingerprint.clone(),
            actual: fingerprint,
        });
    }
    let width = schema.width();
    let dimension = model.dimension()?.get();
    if width != dimension {
        return Err(SegmentError::DimensionMismatch {
            expected: dimension,
            actual: width,
        });
    }
    Ok(())
}

/// Assigns every record to a segment, one pair per record in input order.
///
/// Fails on the first record that lacks a required field
/// (`SchemaMismatch`) or carries an unusable value (`InvalidRecord`).
pub fn assign(
    schema: &EncodingSchema,
    model: &ClusterModel,
    records: &[CandidateRecord],
) -> SegmentResult<Vec<Assignment>> {
    Ok(assign_with_vectors(schema, model, records)?
        .into_iter()
        .map(|(assignment, _)| assignment)
        .collect())
}

/// Like [`assign`], also returning the encoded vector of each record.
pub fn assign_with_vectors(
    schema: &EncodingSchema,
    model: &ClusterModel,
    records: &[CandidateRecord],
) -> SegmentResult<Vec<(Assignment, EncodedVector)>> {
    ensure_paired(schema, model)?;

    let assigned = records
        .iter()
        .map(|record| {
            let vector = schema.encode(record)?;
            let cluster_id = model.predict(vector.as_slice())?;
            Ok((
                Assignment {
                    candidate_id: record.id.clone(),
                    cluster_id,
                },
                vector,
            ))
        })
        .collect::<SegmentResult<Vec<_>>>()?;

    tracing::debug!(records = assigned.len(), k = model.k, "assigned records");
    Ok(assigned)
}
