//! `jira_csv`: export Jira issues to a flat CSV file.
//!
//! The pipeline is:
//! 1. [`client`] fetches custom field and status metadata, then pages of issues
//! 2. [`schema`] compiles field metadata into ordered [`model::ColumnDescriptor`]s
//! 3. [`flatten`] turns each raw issue into one [`model::Row`]
//! 4. [`format::csv`] writes the rows
//!
//! [`export::run_export`] drives the whole thing; the binary in `main.rs`
//! wraps it with the [`cli`] layer and layered [`config`].

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod flatten;
pub mod format;
pub mod logging;
pub mod model;
pub mod schema;
pub mod util;

pub use error::{ErrorCode, JiraCsvError, Result, StructuredError};
