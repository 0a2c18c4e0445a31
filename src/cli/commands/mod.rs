//! Subcommand implementations.

pub mod columns;
pub mod completions;
pub mod export;
pub mod fields;
pub mod statuses;

use crate::client::JiraClient;
use crate::config::{self, ClientSettings, CliOverrides, ConfigLayer};
use crate::error::Result;

/// Load layered config and build a client from it.
///
/// # Errors
///
/// Returns an error if config cannot be loaded, a connection setting is
/// missing or invalid, or the HTTP client cannot be built.
pub fn connect(overrides: &CliOverrides) -> Result<(ConfigLayer, JiraClient)> {
    let layer = config::load_config(overrides)?;
    let client = JiraClient::new(&ClientSettings::from_layer(&layer)?)?;
    Ok((layer, client))
}
