//! Safe path traversal through nested issue JSON.
//!
//! Resolution never fails: a missing key, a `null` parent or a scalar where
//! an object was expected all produce an empty result. Arrays met on the way
//! fan out, so `fields.approvers.displayName` yields one value per approver.

use crate::model::FieldPath;
use serde_json::Value;

/// Controls ordering, deduplication and empty-value handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Sort the resolved strings lexicographically.
    pub sort: bool,
    /// Drop repeated values, keeping the first occurrence.
    pub unique: bool,
    /// Emit `null` and empty-string leaves as `""` instead of dropping them.
    pub keep_empty: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            sort: true,
            unique: false,
            keep_empty: false,
        }
    }
}

/// Resolve `path` against `record`, returning every scalar reached.
#[must_use]
pub fn resolve(record: &Value, path: &FieldPath, options: ResolveOptions) -> Vec<String> {
    let mut out = Vec::new();
    walk(record, path.segments(), options, &mut out);

    if options.unique {
        let mut seen = Vec::with_capacity(out.len());
        out.retain(|value| {
            if seen.contains(value) {
                false
            } else {
                seen.push(value.clone());
                true
            }
        });
    }
    if options.sort {
        out.sort();
    }
    out
}

fn walk(value: &Value, segments: &[String], options: ResolveOptions, out: &mut Vec<String>) {
    let Some((segment, rest)) = segments.split_first() else {
        emit_leaf(value, options, out);
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(segment) {
                walk(child, rest, options, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(child) = items.get(index) {
                    walk(child, rest, options, out);
                }
                return;
            }
            for item in items {
                walk(item, segments, options, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

fn emit_leaf(value: &Value, options: ResolveOptions, out: &mut Vec<String>) {
    match value {
        Value::Null => {
            if options.keep_empty {
                out.push(String::new());
            }
        }
        Value::String(s) => {
            if !s.is_empty() || options.keep_empty {
                out.push(s.clone());
            }
        }
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                emit_leaf(item, options, out);
            }
        }
        Value::Object(_) => out.push(value.to_string()),
    }
}
