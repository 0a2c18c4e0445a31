//! Issue flattening for `jira_csv`.
//!
//! Turns one raw issue (decoded JSON) into a [`Row`] of string cells, one
//! per compiled column:
//!
//! 1. [`Flattener::prepare`] produces a transformed copy of the issue:
//!    the description is truncated first, then each packed time-in-status
//!    string is decoded into an object keyed by status name.
//! 2. [`flatten_row`] resolves every column path, aggregates or joins the
//!    values and normalises the resulting cell.
//!
//! Nothing here fails. Problems with a single issue are returned as
//! [`FlattenWarning`]s carrying the issue and field ids.

pub mod path;
pub mod time_in_status;

pub use path::{ResolveOptions, resolve};
pub use time_in_status::{DecodeError, StatusDuration, StatusIndex, decode, decode_to_value};

use crate::model::{Aggregate, ColumnDescriptor, FieldPath, Row};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Placeholder some automation rules leave in email fields instead of a value.
pub const REPORTER_EMAIL_PLACEHOLDER: &str = "{{issue.reporter.emailAddress}}";
/// Marker Jira writes into cells that should have used the Epic Link field.
pub const EPIC_LINK_MARKER: &str = "EPIC_LINK_SHOULD_BE_USED";
/// Default separator between multiple values in one cell.
pub const DEFAULT_SUBDELIMITER: &str = "; ";

static NEW_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\n\r|\n|\r").expect("valid regex"));

/// Cell-level behaviour knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Joins multiple values of a non-aggregated column.
    pub subdelimiter: String,
    /// Replace line breaks with a single space.
    pub remove_new_lines: bool,
    /// Sort resolved values before joining.
    pub sort: bool,
    /// Drop repeated values before joining.
    pub unique: bool,
    /// Truncate descriptions longer than this many characters.
    pub max_description_length: Option<usize>,
    /// Decode packed time-in-status fields before resolving paths.
    pub expand_time_in_status: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            subdelimiter: DEFAULT_SUBDELIMITER.to_string(),
            remove_new_lines: false,
            sort: true,
            unique: false,
            max_description_length: None,
            expand_time_in_status: false,
        }
    }
}

impl FlattenOptions {
    #[must_use]
    pub const fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            sort: self.sort,
            unique: self.unique,
            keep_empty: false,
        }
    }
}

/// A recoverable per-issue problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenWarning {
    pub issue_id: String,
    pub field_id: String,
    pub error: DecodeError,
}

impl fmt::Display for FlattenWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "issue {} field {}: {}",
            self.issue_id, self.field_id, self.error
        )
    }
}

/// Flattens issues against one immutable column list.
///
/// Holds only shared references, so one `Flattener` can serve any number of
/// issues (or threads).
#[derive(Debug, Clone, Copy)]
pub struct Flattener<'a> {
    columns: &'a [ColumnDescriptor],
    options: &'a FlattenOptions,
    statuses: &'a StatusIndex,
    time_in_status_fields: &'a [String],
}

impl<'a> Flattener<'a> {
    #[must_use]
    pub const fn new(
        columns: &'a [ColumnDescriptor],
        options: &'a FlattenOptions,
        statuses: &'a StatusIndex,
        time_in_status_fields: &'a [String],
    ) -> Self {
        Self {
            columns,
            options,
            statuses,
            time_in_status_fields,
        }
    }

    #[must_use]
    pub const fn columns(&self) -> &'a [ColumnDescriptor] {
        self.columns
    }

    /// Apply description truncation and time-in-status decoding.
    ///
    /// The input is borrowed untouched; a copy is made only when something
    /// changes.
    #[must_use]
    pub fn prepare<'v>(&self, issue: &'v Value) -> (Cow<'v, Value>, Vec<FlattenWarning>) {
        let mut prepared = Cow::Borrowed(issue);
        let mut warnings = Vec::new();

        if let Some(max) = self.options.max_description_length {
            if let Some(truncated) = issue
                .pointer("/fields/description")
                .and_then(Value::as_str)
                .and_then(|description| truncate_description(description, max))
            {
                set_field(prepared.to_mut(), "description", Value::String(truncated));
            }
        }

        if self.options.expand_time_in_status {
            for field_id in self.time_in_status_fields {
                let raw = issue.get("fields").and_then(|fields| fields.get(field_id));
                if time_in_status::is_absent(raw) {
                    continue;
                }
                let Some(packed) = raw.and_then(Value::as_str) else {
                    continue;
                };
                let replacement = match decode_to_value(packed, self.statuses) {
                    Ok(decoded) => decoded,
                    Err(error) => {
                        warnings.push(FlattenWarning {
                            issue_id: issue_id(issue),
                            field_id: field_id.clone(),
                            error,
                        });
                        Value::Null
                    }
                };
                set_field(prepared.to_mut(), field_id, replacement);
            }
        }

        (prepared, warnings)
    }

    /// Prepare and flatten one issue.
    #[must_use]
    pub fn flatten(&self, issue: &Value) -> (Row, Vec<FlattenWarning>) {
        let (prepared, warnings) = self.prepare(issue);
        (flatten_row(&prepared, self.columns, self.options), warnings)
    }
}

/// Flatten an already prepared issue into one cell per column.
#[must_use]
pub fn flatten_row(issue: &Value, columns: &[ColumnDescriptor], options: &FlattenOptions) -> Row {
    let mut row = Row::with_capacity(columns.len());
    for column in columns {
        row.push(column.name.clone(), cell_value(issue, column, options));
    }
    row
}

fn cell_value(issue: &Value, column: &ColumnDescriptor, options: &FlattenOptions) -> String {
    let Some(path) = &column.path else {
        return String::new();
    };

    let resolve_options = options.resolve_options();
    let mut values = resolve(issue, path, resolve_options);
    if values.len() == 1 && values[0] == REPORTER_EMAIL_PLACEHOLDER {
        values = resolve(
            issue,
            &FieldPath::dotted("fields.reporter.emailAddress"),
            resolve_options,
        );
        tracing::debug!(column = %column.name, "Replaced reporter email placeholder");
    }

    let joined = match column.aggregate {
        Some(Aggregate::Sum) => format_number(values.iter().map(|v| to_number(v)).sum()),
        Some(Aggregate::Max) if values.len() > 1 => format_number(
            values
                .iter()
                .map(|v| to_number(v))
                .fold(f64::NEG_INFINITY, f64::max),
        ),
        Some(Aggregate::Max) | None => values.join(&options.subdelimiter),
    };

    normalize_cell(&joined, options.remove_new_lines)
}

/// Strip line breaks (optionally), trim, and blank out Epic Link markers.
#[must_use]
pub fn normalize_cell(value: &str, remove_new_lines: bool) -> String {
    let value = if remove_new_lines {
        NEW_LINES.replace_all(value, " ")
    } else {
        Cow::Borrowed(value)
    };
    let trimmed = value.trim();
    if trimmed.contains(EPIC_LINK_MARKER) {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Shorten `description` to `max - 3` characters plus `...` when too long.
#[must_use]
pub fn truncate_description(description: &str, max: usize) -> Option<String> {
    if description.chars().count() <= max {
        return None;
    }
    let mut truncated: String = description.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    Some(truncated)
}

/// Issue identifier used in warnings: `key`, then `id`.
#[must_use]
pub fn issue_id(issue: &Value) -> String {
    ["key", "id"]
        .iter()
        .find_map(|key| match issue.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn set_field(issue: &mut Value, field_id: &str, value: Value) {
    if let Some(fields) = issue.get_mut("fields").and_then(Value::as_object_mut) {
        fields.insert(field_id.to_string(), value);
    }
}

fn to_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}
