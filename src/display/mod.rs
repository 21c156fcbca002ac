//! Terminal display for the CLI: styled tables, spinner and theme.

pub mod progress;
pub mod tables;
pub mod theme;

pub use progress::{create_spinner, with_spinner};
pub use tables::{
    TableBuilder, create_assignment_table, create_evaluation_table, create_segment_table,
    create_summary_table, create_sweep_table, create_versions_table,
};
pub use theme::{THEME, Theme};
