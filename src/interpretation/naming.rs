//! Segment naming seam.
//!
//! The engine does not write prose. A [`SegmentNamer`] turns a
//! [`SegmentSummary`] into a short name and description; the default
//! [`TemplateNamer`] fills a plain text template from the descriptors.

use serde::{Deserialize, Serialize};

use super::summary::SegmentSummary;
use crate::types::{CandidateId, ClusterId};

/// Produces the display name and description of a segment.
pub trait SegmentNamer: Send + Sync {
    fn name(&self, summary: &SegmentSummary) -> String;

    fn describe(&self, summary: &SegmentSummary) -> String {
        format!(
            "{} candidates ({:.1}%)",
            summary.member_count, summary.member_percentage
        )
    }
}

/// Template-based namer.
///
/// Placeholders: `{id}`, `{count}`, `{percent}` and `{descriptors}`, the
/// latter rendered as `high years_experience, low desired_salary`.
#[derive(Debug, Clone)]
pub struct TemplateNamer {
    name_template: String,
    description_template: String,
    max_descriptors: usize,
}

impl Default for TemplateNamer {
    fn default() -> Self {
        Self {
            name_template: "Segment {id}: {descriptors}".to_string(),
            description_template: "{count} candidates ({percent}%), {descriptors}".to_string(),
            max_descriptors: 2,
        }
    }
}

impl TemplateNamer {
    pub fn new(name_template: impl Into<String>) -> Self {
        Self {
            name_template: name_template.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, template: impl Into<String>) -> Self {
        self.description_template = template.into();
        self
    }

    /// Descriptors used in the name; the description uses all of them.
    pub fn with_max_descriptors(mut self, max: usize) -> Self {
        self.max_descriptors = max;
        self
    }

    fn render(&self, template: &str, summary: &SegmentSummary, limit: usize) -> String {
        let descriptors = summary
            .descriptors
            .iter()
            .take(limit)
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let descriptors = if descriptors.is_empty() {
            "undifferentiated".to_string()
        } else {
            descriptors.join(", ")
        };

        template
            .replace("{id}", &summary.cluster_id.to_string())
            .replace("{count}", &summary.member_count.to_string())
            .replace("{percent}", &format!("{:.1}", summary.member_percentage))
            .replace("{descriptors}", &descriptors)
    }
}

impl SegmentNamer for TemplateNamer {
    fn name(&self, summary: &SegmentSummary) -> String {
        self.render(&self.name_template, summary, self.max_descriptors)
    }

    fn describe(&self, summary: &SegmentSummary) -> String {
        self.render(&self.description_template, summary, usize::MAX)
    }
}

/// A named, targetable audience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: ClusterId,
    pub name: String,
    pub description: String,
    pub member_count: usize,
    pub members: Vec<CandidateId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpretation::summary::{Direction, FeatureDescriptor};
    use crate::record::FieldKind;

    fn summary() -> SegmentSummary {
        SegmentSummary {
            cluster_id: ClusterId::new(2).unwrap(),
            member_count: 40,
            member_percentage: 25.0,
            descriptors: vec![
                FeatureDescriptor {
                    field: "years_experience".to_string(),
                    kind: FieldKind::Numeric,
                    label: "years_experience".to_string(),
                    direction: Direction::High,
                    deviation: 1.4,
                },
                FeatureDescriptor {
                    field: "desired_salary".to_string(),
                    kind: FieldKind::Numeric,
                    label: "desired_salary".to_string(),
                    direction: Direction::Low,
                    deviation: -0.9,
                },
                FeatureDescriptor {
                    field: "location".to_string(),
                    kind: FieldKind::Categorical,
                    label: "location=Berlin".to_string(),
                    direction: Direction::High,
                    deviation: 0.3,
                },
            ],
        }
    }

    #[test]
    fn test_default_template() {
        let namer = TemplateNamer::default();
        assert_eq!(
            namer.name(&summary()),
            "Segment 2: high years_experience, low desired_salary"
        );
        assert_eq!(
            namer.describe(&summary()),
            "40 candidates (25.0%), high years_experience, low desired_salary, high location=Berlin"
        );
    }

    #[test]
    fn test_custom_template_and_empty_descriptors() {
        let namer = TemplateNamer::new("Audience #{id} [{count}]").with_max_descriptors(1);
        assert_eq!(namer.name(&summary()), "Audience #2 [40]");

        let mut flat = summary();
        flat.descriptors.clear();
        assert_eq!(
            TemplateNamer::default().name(&flat),
            "Segment 2: undifferentiated"
        );
    }

    struct Fixed;

    impl SegmentNamer for Fixed {
        fn name(&self, summary: &SegmentSummary) -> String {
            format!("fixed-{}", summary.cluster_id)
        }
    }

    #[test]
    fn test_trait_default_description() {
        assert_eq!(Fixed.name(&summary()), "fixed-2");
        assert_eq!(Fixed.describe(&summary()), "40 candidates (25.0%)");
    }
}
