//! Shared utilities for `jira_csv`.

pub mod progress;

pub use progress::{ExportProgress, should_show_progress};
