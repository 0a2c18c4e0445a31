//! Output formatting for `jira_csv`.
//!
//! - [`csv`] writes flattened rows: every field quoted, `\n` line endings.
//! - [`text`] renders the aligned tables used by `fields`, `statuses` and
//!   `columns`.

pub mod csv;
mod text;

pub use csv::{CsvSink, write_csv};
pub use text::{render_table, terminal_width, truncate_cell};
