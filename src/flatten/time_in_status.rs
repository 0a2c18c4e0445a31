//! Decoder for the charting plugin's packed "time in status" string.
//!
//! The raw value looks like `1_*:*_3_*:*_100_*|*_10001_*:*_1_*:*_5000`:
//! entries separated by `_*|*_`, each entry `status_id _*:*_ count _*:*_ duration`.
//! The decoded form is a JSON object keyed by status *name* so that column
//! paths such as `fields.<id>.<status name>.count` resolve against it.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::model::StatusMetadata;

/// Separator between entries.
pub const ENTRY_DELIMITER: &str = "_*|*_";
/// Separator between the three sub-fields of one entry.
pub const FIELD_DELIMITER: &str = "_*:*_";

/// Why a packed time-in-status value could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Entry references a status id missing from the status metadata.
    #[error("unknown status id '{status_id}'")]
    UnknownStatus { status_id: String },

    /// Entry does not have exactly three sub-fields.
    #[error("malformed entry '{entry}'")]
    MalformedEntry { entry: String },

    /// Count or duration is not a number.
    #[error("invalid number '{value}' in entry '{entry}'")]
    InvalidNumber { entry: String, value: String },
}

/// Per-status figures decoded from one entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusDuration {
    pub count: f64,
    pub duration: f64,
}

/// Status lookup by id, built once per export.
#[derive(Debug, Clone, Default)]
pub struct StatusIndex {
    by_id: HashMap<String, String>,
}

impl StatusIndex {
    #[must_use]
    pub fn new(statuses: &[StatusMetadata]) -> Self {
        let by_id = statuses
            .iter()
            .map(|status| (status.id.clone(), status.name.clone()))
            .collect();
        Self { by_id }
    }

    #[must_use]
    pub fn name(&self, status_id: &str) -> Option<&str> {
        self.by_id.get(status_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// True for the raw values Jira uses to mean "no data".
#[must_use]
pub fn is_absent(raw: Option<&Value>) -> bool {
    match raw {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty() || s == "null",
        Some(_) => false,
    }
}

/// Decode a packed string into `(status name, figures)` pairs in input order.
///
/// `""` and `"null"` decode to nothing. A repeated status name keeps the last
/// entry.
///
/// # Errors
///
/// Returns [`DecodeError`] if an entry is malformed, holds a non-numeric
/// figure, or references a status id absent from `statuses`.
pub fn decode(
    raw: &str,
    statuses: &StatusIndex,
) -> Result<Vec<(String, StatusDuration)>, DecodeError> {
    if raw.is_empty() || raw == "null" {
        return Ok(Vec::new());
    }

    let mut decoded: Vec<(String, StatusDuration)> = Vec::new();
    for entry in raw.split(ENTRY_DELIMITER) {
        let parts: Vec<&str> = entry.split(FIELD_DELIMITER).collect();
        let [status_id, count, duration] = parts.as_slice() else {
            return Err(DecodeError::MalformedEntry {
                entry: entry.to_string(),
            });
        };

        let name = statuses
            .name(status_id.trim())
            .ok_or_else(|| DecodeError::UnknownStatus {
                status_id: status_id.trim().to_string(),
            })?;
        let figures = StatusDuration {
            count: parse_number(entry, count)?,
            duration: parse_number(entry, duration)?,
        };

        if let Some(existing) = decoded.iter_mut().find(|(n, _)| n == name) {
            existing.1 = figures;
        } else {
            decoded.push((name.to_string(), figures));
        }
    }
    Ok(decoded)
}

/// Decode straight into the JSON object shape the column paths expect.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_to_value(raw: &str, statuses: &StatusIndex) -> Result<Value, DecodeError> {
    let mut map = Map::new();
    for (name, figures) in decode(raw, statuses)? {
        let mut entry = Map::new();
        entry.insert("count".to_string(), number_value(figures.count));
        entry.insert("duration".to_string(), number_value(figures.duration));
        map.insert(name, Value::Object(entry));
    }
    Ok(Value::Object(map))
}

fn parse_number(entry: &str, value: &str) -> Result<f64, DecodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| DecodeError::InvalidNumber {
            entry: entry.to_string(),
            value: value.to_string(),
        })
}

#[allow(clippy::cast_possible_truncation)]
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
