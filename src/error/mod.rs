//! Error types and handling for `jira_csv`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration via the `Other` variant
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripted callers
//!
//! Per-issue problems during flattening are *not* errors: they are reported
//! as [`crate::flatten::FlattenWarning`]s so one bad issue never aborts an
//! export.

mod structured;

pub use structured::{ErrorCode, StructuredError, find_similar_names};

use crate::flatten::DecodeError;
use thiserror::Error;

/// Primary error type for `jira_csv` operations.
#[derive(Error, Debug)]
pub enum JiraCsvError {
    // === HTTP Errors ===
    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An extra header could not be parsed or is not a valid HTTP header.
    #[error("Invalid header '{header}': expected 'Name: value'")]
    InvalidHeader { header: String },

    // === Query / Settings Errors ===
    /// Both a project and a raw JQL query were supplied.
    #[error("Cannot use both a project and a JQL query")]
    ConflictingQuery,

    /// A required setting has no value.
    #[error("Missing setting: {key}")]
    MissingSetting { key: String },

    /// A setting has a value that cannot be used.
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },

    // === Data Errors ===
    /// Packed time-in-status value could not be decoded.
    #[error("Time in status decode failed: {0}")]
    Decode(#[from] DecodeError),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Wrapped errors ===
    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JiraCsvError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ConflictingQuery
                | Self::MissingSetting { .. }
                | Self::InvalidSetting { .. }
                | Self::InvalidHeader { .. }
                | Self::Http {
                    status: 400 | 401 | 403 | 404,
                    ..
                }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ConflictingQuery => Some("Pass either --project or --jql, not both"),
            Self::MissingSetting { key } if key == "domain" => {
                Some("Set --domain, JIRA_DOMAIN, or 'domain' in the config file")
            }
            Self::MissingSetting { .. } => Some("Set it on the command line or in the config file"),
            Self::InvalidHeader { .. } => Some("Use the form --header 'Name: value'"),
            Self::Http { status: 401, .. } => {
                Some("Check --user-email and --api-token (or JIRA_USER_EMAIL / JIRA_API_TOKEN)")
            }
            Self::Http { status: 403, .. } => Some("The account lacks permission for this query"),
            Self::Http { status: 404, .. } => Some("Check --domain points at your Jira site"),
            Self::Http { status: 429, .. } => Some("Increase --wait-ms between requests"),
            _ => None,
        }
    }

    /// Create a settings error for a specific key.
    #[must_use]
    pub fn invalid_setting(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Wrap any error with a context message.
    #[must_use]
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

/// Result type using `JiraCsvError`.
pub type Result<T> = std::result::Result<T, JiraCsvError>;
