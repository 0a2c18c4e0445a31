//! Core data types for `jira_csv`.
//!
//! This module defines the types shared by the compiler, the flattener and
//! the exporter:
//! - `FieldMetadata` / `FieldSchema` - Jira field descriptions
//! - `SchemaKind` - closed classification of a field schema
//! - `StatusMetadata` - workflow status id/name pairs
//! - `ColumnDescriptor` - one output column (name, path, aggregation)
//! - `Row` - one flattened issue

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// `schema.custom` of a Service Desk request-language field.
pub const CUSTOM_REQUEST_LANGUAGE: &str =
    "com.atlassian.servicedesk.servicedesk-lingo-integration-plugin:sd-request-language";
/// `schema.custom` of a Service Desk SLA field.
pub const CUSTOM_SLA: &str = "com.atlassian.servicedesk:sd-sla-field";
/// `schema.custom` of a Service Desk customer request type field.
pub const CUSTOM_REQUEST_TYPE: &str = "com.atlassian.servicedesk:vp-origin";
/// `schema.custom` of the charting plugin "time in status" field.
pub const CUSTOM_TIME_IN_STATUS: &str = "com.atlassian.jira.ext.charting:timeinstatus";
/// Display name Jira gives the charting "time in status" field.
pub const TIME_IN_STATUS_FIELD_NAME: &str = "[CHART] Time in Status";

/// Schema block attached to a field by the field search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            items: None,
            custom: None,
        }
    }

    #[must_use]
    pub fn with_items(mut self, items: impl Into<String>) -> Self {
        self.items = Some(items.into());
        self
    }

    #[must_use]
    pub fn with_custom(mut self, custom: impl Into<String>) -> Self {
        self.custom = Some(custom.into());
        self
    }

    /// Classify this schema into the closed set of column-generation rules.
    #[must_use]
    pub fn kind(&self) -> SchemaKind {
        SchemaKind::classify(self)
    }
}

/// Field metadata as returned by `/rest/api/3/field/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub schema: FieldSchema,
}

impl FieldMetadata {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, schema: FieldSchema) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            schema,
        }
    }
}

/// Workflow status as returned by `/rest/api/3/statuses/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMetadata {
    pub id: String,
    pub name: String,
}

impl StatusMetadata {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How a field schema expands into output columns.
///
/// Classification is total: anything unrecognised is `Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Single user: display name + email.
    User,
    /// List of users: display names + emails.
    UserArray,
    /// Single select option: `.value`.
    Option,
    /// Multi select options: `.value` of each.
    OptionArray,
    /// Service Desk request language: code + display name.
    RequestLanguage,
    /// Service Desk SLA: summed elapsed time, max goal duration.
    Sla,
    /// Service Desk customer request type: current status.
    CustomerRequestType,
    /// Charting plugin packed time-in-status string.
    TimeInStatus,
    /// Anything else: the raw field value.
    Raw,
}

impl SchemaKind {
    #[must_use]
    pub fn classify(schema: &FieldSchema) -> Self {
        let custom = schema.custom.as_deref();
        match (schema.type_.as_str(), schema.items.as_deref(), custom) {
            ("user", _, _) => Self::User,
            ("array", Some("user"), _) => Self::UserArray,
            ("array", Some("option"), _) => Self::OptionArray,
            ("option", _, _) => Self::Option,
            ("sd-request-lang", _, Some(CUSTOM_REQUEST_LANGUAGE)) => Self::RequestLanguage,
            ("sd-servicelevelagreement", _, Some(CUSTOM_SLA)) => Self::Sla,
            ("sd-customerrequesttype", _, Some(CUSTOM_REQUEST_TYPE)) => Self::CustomerRequestType,
            ("any", _, Some(CUSTOM_TIME_IN_STATUS)) => Self::TimeInStatus,
            _ => Self::Raw,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::UserArray => "user_array",
            Self::Option => "option",
            Self::OptionArray => "option_array",
            Self::RequestLanguage => "request_language",
            Self::Sla => "sla",
            Self::CustomerRequestType => "customer_request_type",
            Self::TimeInStatus => "time_in_status",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reduction applied when a path resolves to several values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Max,
}

impl Aggregate {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Max => "max",
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered segments leading from the issue root to a value.
///
/// Segments are plain object keys; arrays met along the way fan out.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Build a path from explicit segments (keys may contain dots).
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Build a path from a dotted string such as `fields.assignee.displayName`.
    #[must_use]
    pub fn dotted(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|segment| !segment.is_empty())
                .map(ToString::to_string)
                .collect(),
        )
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// One output column.
///
/// A `None` path is a placeholder that always renders as an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub path: Option<FieldPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
}

impl ColumnDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, path: FieldPath) -> Self {
        Self {
            name: name.into(),
            path: Some(path),
            aggregate: None,
        }
    }

    #[must_use]
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            aggregate: None,
        }
    }

    #[must_use]
    pub const fn aggregated(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.path.is_none()
    }
}

/// One flattened issue: cells in column order, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Cell value for a column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, value)| value.as_str())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    /// Cell values in `columns` order; cells the row lacks come back empty.
    ///
    /// Rows built for the same column list are read positionally. Anything
    /// else falls back to a lookup by name.
    #[must_use]
    pub fn values_for<'a>(&'a self, columns: &'a [String]) -> Vec<&'a str> {
        let aligned = self.cells.len() == columns.len()
            && self
                .cells
                .iter()
                .zip(columns)
                .all(|((name, _), column)| name == column);
        if aligned {
            return self.values().collect();
        }
        let by_name: HashMap<&str, &str> = self.iter().collect();
        columns
            .iter()
            .map(|column| by_name.get(column.as_str()).copied().unwrap_or(""))
            .collect()
    }

    /// Drop the named columns, keeping the order of the rest.
    pub fn remove_columns(&mut self, names: &[String]) {
        let names: HashSet<&str> = names.iter().map(String::as_str).collect();
        self.cells.retain(|(name, _)| !names.contains(name.as_str()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
