//! The segmentation engine facade.
//!
//! Composes encoding, training, the registry, evaluation, interpretation
//! and assignment into the operations the surrounding application calls.
//! Every operation is a synchronous batch call; the engine keeps no state
//! besides the registry's cached current version.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assignment::{assign, assign_with_vectors};
use crate::clustering::ClusterTrainer;
use crate::config::Settings;
use crate::encoding::FeatureEncoder;
use crate::error::{SegmentError, SegmentResult};
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::interpretation::{Interpreter, Segment, SegmentNamer, SegmentSummary};
use crate::record::{CandidateRecord, CandidateSource};
use crate::registry::{LoadedVersion, ModelRegistry, TrainingSnapshot, VersionManifest};
use crate::types::{Assignment, ClusterId, VersionId};

pub struct SegmentationEngine {
    settings: Settings,
    encoder: FeatureEncoder,
    trainer: ClusterTrainer,
    evaluator: Evaluator,
    registry: Arc<ModelRegistry>,
}

impl SegmentationEngine {
    /// Creates an engine with a registry at `settings.registry_path`.
    pub fn new(settings: Settings) -> SegmentResult<Self> {
        let registry = Arc::new(ModelRegistry::from_settings(&settings));
        Self::with_registry(settings, registry)
    }

    /// Creates an engine sharing an existing registry, so several engines
    /// in one process contend for the same training slot.
    pub fn with_registry(settings: Settings, registry: Arc<ModelRegistry>) -> SegmentResult<Self> {
        settings.validate()?;
        Ok(Self {
            encoder: FeatureEncoder::new(settings.encoder.clone())?,
            trainer: ClusterTrainer::from_settings(&settings)?,
            evaluator: Evaluator::new(settings.evaluation.clone()),
            registry,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Fits a schema and model on `records` and commits them as a new
    /// version. `k = None` selects the segment count automatically.
    pub fn train(&self, records: &[CandidateRecord], k: Option<usize>) -> SegmentResult<VersionId> {
        self.train_with_cancel(records, k, &CancellationToken::new())
    }

    /// Like [`train`](Self::train); `cancel` interrupts the k-sweep between
    /// candidates. The training slot is held for the whole run.
    pub fn train_with_cancel(
        &self,
        records: &[CandidateRecord],
        k: Option<usize>,
        cancel: &CancellationToken,
    ) -> SegmentResult<VersionId> {
        let guard = self.registry.begin_training()?;

        let (schema, vectors) = self.encoder.fit_transform(records)?;
        let model = self.trainer.train_with_cancel(&vectors, k, &schema, cancel)?;

        let snapshot = if self.settings.registry.keep_training_snapshot {
            let labels = model.predict_all(&vectors)?;
            Some(TrainingSnapshot {
                candidate_ids: records.iter().map(|r| r.id.clone()).collect(),
                vectors,
                labels,
            })
        } else {
            None
        };

        guard.commit(&schema, &model, snapshot.as_ref())
    }

    /// Reads records from `source` and trains on them.
    pub fn train_from(
        &self,
        source: &dyn CandidateSource,
        k: Option<usize>,
    ) -> SegmentResult<VersionId> {
        let records = source.candidates()?;
        self.train(&records, k)
    }

    /// Assigns records with a stored version (latest when `None`).
    pub fn assign(
        &self,
        records: &[CandidateRecord],
        version: Option<&VersionId>,
    ) -> SegmentResult<Vec<Assignment>> {
        let loaded = self.registry.load(version)?;
        assign(&loaded.schema, &loaded.model, records)
    }

    /// Evaluates a version against the training vectors stored with it.
    pub fn evaluate(&self, version: Option<&VersionId>) -> SegmentResult<EvaluationReport> {
        let (loaded, snapshot) = self.load_with_snapshot(version)?;
        self.evaluator
            .evaluate(&loaded.model, &snapshot.vectors, &snapshot.optional_labels())
    }

    /// Assigns a supplied sample and evaluates the resulting partition.
    pub fn evaluate_sample(
        &self,
        records: &[CandidateRecord],
        version: Option<&VersionId>,
    ) -> SegmentResult<EvaluationReport> {
        let loaded = self.registry.load(version)?;
        let (labels, vectors): (Vec<_>, Vec<_>) =
            assign_with_vectors(&loaded.schema, &loaded.model, records)?
                .into_iter()
                .map(|(assignment, vector)| (Some(assignment.cluster_id), vector))
                .unzip();
        self.evaluator.evaluate(&loaded.model, &vectors, &labels)
    }

    /// Summarizes each segment of a version from its stored training data.
    pub fn interpret(
        &self,
        version: Option<&VersionId>,
        top_n: Option<usize>,
    ) -> SegmentResult<BTreeMap<ClusterId, SegmentSummary>> {
        let (loaded, snapshot) = self.load_with_snapshot(version)?;
        self.interpreter(top_n).interpret(
            &loaded.model,
            &snapshot.vectors,
            &snapshot.optional_labels(),
            &loaded.schema,
        )
    }

    /// Assigns `records` and returns one named segment per cluster, with
    /// its members.
    pub fn segments(
        &self,
        records: &[CandidateRecord],
        version: Option<&VersionId>,
        namer: &dyn SegmentNamer,
    ) -> SegmentResult<Vec<Segment>> {
        let loaded = self.registry.load(version)?;
        let assigned = assign_with_vectors(&loaded.schema, &loaded.model, records)?;

        let mut members: BTreeMap<ClusterId, Vec<_>> = BTreeMap::new();
        let mut labels = Vec::with_capacity(assigned.len());
        let mut vectors = Vec::with_capacity(assigned.len());
        for (assignment, vector) in assigned {
            members
                .entry(assignment.cluster_id)
                .or_default()
                .push(assignment.candidate_id);
            labels.push(Some(assignment.cluster_id));
            vectors.push(vector);
        }

        let summaries = self.interpreter(None).interpret(
            &loaded.model,
            &vectors,
            &labels,
            &loaded.schema,
        )?;

        Ok(summaries
            .into_values()
            .map(|summary| Segment {
                id: summary.cluster_id,
                name: namer.name(&summary),
                description: namer.describe(&summary),
                member_count: summary.member_count,
                members: members.remove(&summary.cluster_id).unwrap_or_default(),
            })
            .collect())
    }

    pub fn latest(&self) -> SegmentResult<VersionId> {
        self.registry.latest()
    }

    pub fn versions(&self) -> SegmentResult<Vec<VersionManifest>> {
        self.registry.versions()
    }

    fn interpreter(&self, top_n: Option<usize>) -> Interpreter {
        Interpreter::new(top_n.unwrap_or(self.settings.interpretation.top_n))
    }

    fn load_with_snapshot(
        &self,
        version: Option<&VersionId>,
    ) -> SegmentResult<(Arc<LoadedVersion>, TrainingSnapshot)> {
        let loaded = self.registry.load(version)?;
        let snapshot = self
            .registry
            .load_snapshot(&loaded.version)?
            .ok_or(SegmentError::InsufficientData {
                what: "stored training vectors (version has no snapshot)",
                required: 1,
                actual: 0,
            })?;
        Ok((loaded, snapshot))
    }
}
