//! Table formatting for segmentation results.

use std::collections::BTreeMap;

use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::clustering::KSelection;
use crate::evaluation::EvaluationReport;
use crate::interpretation::{Segment, SegmentSummary};
use crate::registry::VersionManifest;
use crate::types::{Assignment, ClusterId};

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        Self {
            table: styled_table(),
        }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        self.table.set_header(bold_cells(headers));
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    // Apply rounded corners
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table
}

fn bold_cells(headers: Vec<&str>) -> Vec<Cell> {
    headers
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect()
}

fn metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

/// Candidate to segment assignments.
pub fn create_assignment_table(assignments: &[Assignment]) -> String {
    let mut builder = TableBuilder::new().set_headers(vec!["Candidate", "Segment"]);
    for assignment in assignments {
        builder = builder.add_row(vec![
            assignment.candidate_id.to_string(),
            assignment.cluster_id.to_string(),
        ]);
    }
    builder.build()
}

/// Evaluation metrics with a validity row.
pub fn create_evaluation_table(report: &EvaluationReport) -> String {
    let mut table = styled_table();
    table.set_header(bold_cells(vec!["Metric", "Value"]));

    // Add rows without ANSI colors (comfy-table doesn't handle them well)
    let (validity, color) = if report.valid {
        ("✓ valid".to_string(), Color::Green)
    } else {
        (
            format!(
                "⚠ not computable: {}",
                report.invalid_reason.as_deref().unwrap_or("degenerate partition")
            ),
            Color::Yellow,
        )
    };
    table.add_row(vec![
        Cell::new("Partition"),
        Cell::new(validity).fg(color).add_attribute(Attribute::Bold),
    ]);

    table.add_row(vec!["Silhouette (higher is better)", &metric(report.silhouette)]);
    table.add_row(vec![
        "Davies-Bouldin (lower is better)",
        &metric(report.davies_bouldin),
    ]);
    table.add_row(vec![
        "Calinski-Harabasz (higher is better)",
        &metric(report.calinski_harabasz),
    ]);
    table.add_row(vec!["Samples", &report.n_samples.to_string()]);
    table.add_row(vec!["Segments", &report.n_clusters.to_string()]);
    if report.sampled {
        table.add_row(vec!["Silhouette sampled", "yes"]);
    }

    table.to_string()
}

/// Per-segment descriptors.
pub fn create_summary_table(summaries: &BTreeMap<ClusterId, SegmentSummary>) -> String {
    let mut builder =
        TableBuilder::new().set_headers(vec!["Segment", "Members", "Share", "Distinguishing features"]);

    for summary in summaries.values() {
        let descriptors = summary
            .descriptors
            .iter()
            .map(|d| format!("{d} ({:+.2})", d.deviation))
            .collect::<Vec<_>>()
            .join("\n");
        builder = builder.add_row(vec![
            summary.cluster_id.to_string(),
            summary.member_count.to_string(),
            format!("{:.1}%", summary.member_percentage),
            descriptors,
        ]);
    }

    builder.build()
}

/// Named segments with member counts.
pub fn create_segment_table(segments: &[Segment]) -> String {
    let mut builder = TableBuilder::new().set_headers(vec!["Segment", "Name", "Members", "Description"]);
    for segment in segments {
        builder = builder.add_row(vec![
            segment.id.to_string(),
            segment.name.clone(),
            segment.member_count.to_string(),
            segment.description.clone(),
        ]);
    }
    builder.build()
}

/// Committed registry versions, newest last.
pub fn create_versions_table(manifests: &[VersionManifest], latest: Option<&str>) -> String {
    let mut builder = TableBuilder::new().set_headers(vec![
        "Version",
        "Saved (UTC)",
        "k",
        "Training size",
        "Snapshot",
    ]);
    for manifest in manifests {
        let marker = if Some(manifest.version.as_str()) == latest {
            " (latest)"
        } else {
            ""
        };
        builder = builder.add_row(vec![
            format!("{}{marker}", manifest.version),
            manifest.saved_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            manifest.k.to_string(),
            manifest.training_size.to_string(),
            if manifest.has_snapshot() { "yes" } else { "no" }.to_string(),
        ]);
    }
    builder.build()
}

/// k-sweep diagnostics of an automatic k choice.
pub fn create_sweep_table(selection: &KSelection) -> String {
    let mut table = styled_table();
    table.set_header(bold_cells(vec!["k", "Inertia", "Silhouette", ""]));

    for point in &selection.candidates {
        let mut marks = Vec::new();
        if point.k == selection.elbow_k {
            marks.push("elbow");
        }
        if point.k == selection.silhouette_k {
            marks.push("best silhouette");
        }
        if point.k == selection.chosen_k {
            marks.push("chosen");
        }

        let row = vec![
            Cell::new(point.k),
            Cell::new(format!("{:.3}", point.inertia)),
            Cell::new(metric(point.silhouette)),
            Cell::new(marks.join(", ")),
        ];
        if point.k == selection.chosen_k {
            table.add_row(
                row.into_iter()
                    .map(|c| c.add_attribute(Attribute::Bold))
                    .collect::<Vec<_>>(),
            );
        } else {
            table.add_row(row);
        }
    }

    table.to_string()
}
