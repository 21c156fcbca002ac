//! Segment interpretation: which features set each segment apart.

pub mod naming;
pub mod summary;

pub use naming::{Segment, SegmentNamer, TemplateNamer};
pub use summary::{Direction, FeatureDescriptor, Interpreter, SegmentSummary};
