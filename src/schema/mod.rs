//! Column schema compilation for `jira_csv`.
//!
//! Turns custom field metadata into an ordered list of
//! [`ColumnDescriptor`]s, appended after a fixed set of built-in columns.
//!
//! # Column names
//!
//! Jira allows several custom fields to share a display name, and a custom
//! field may share its name with a built-in column. Names are made unique
//! with a `" (k)"` suffix on the field name, where `k` is the 1-based
//! occurrence of that name counting built-in columns and earlier custom
//! fields. If a generated name still collides with a column already placed
//! (for example a user field called "Reporter" producing "Reporter Name"),
//! `k` is bumped until every generated name is free.
//!
//! # Column selection
//!
//! [`select_columns`] narrows the compiled list to a caller-supplied list of
//! names, in that order, adding empty placeholder columns for names the
//! schema does not know.

use crate::error::find_similar_names;
use crate::model::{
    Aggregate, ColumnDescriptor, FieldMetadata, FieldPath, SchemaKind, StatusMetadata,
    TIME_IN_STATUS_FIELD_NAME,
};
use std::collections::HashSet;

/// Built-in columns: (name, dotted path), in output order.
pub const BUILTIN_COLUMNS: &[(&str, &str)] = &[
    ("ID", "id"),
    ("Key", "key"),
    ("URL", "self"),
    ("Created", "fields.created"),
    ("Summary", "fields.summary"),
    ("Description", "fields.description"),
    ("Labels", "fields.labels"),
    ("Assignee Name", "fields.assignee.displayName"),
    ("Assignee Email", "fields.assignee.emailAddress"),
    ("Creator Name", "fields.creator.displayName"),
    ("Creator Email", "fields.creator.emailAddress"),
    ("Issue Type Name", "fields.issuetype.name"),
    ("Issue Type Description", "fields.issuetype.description"),
    ("Project ID", "fields.project.id"),
    ("Project Key", "fields.project.key"),
    ("Project Name", "fields.project.name"),
    ("Reporter Name", "fields.reporter.displayName"),
    ("Reporter Email", "fields.reporter.emailAddress"),
    ("Status Category Change Date", "fields.statuscategorychangedate"),
];

/// Schema compilation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Expand the time-in-status field into per-status count/duration columns.
    pub expand_time_in_status: bool,
}

/// Result of narrowing a compiled schema to requested names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub columns: Vec<ColumnDescriptor>,
    /// Requested names with no compiled column; rendered as empty cells.
    pub missing: Vec<String>,
}

/// The fixed built-in columns.
#[must_use]
pub fn builtin_columns() -> Vec<ColumnDescriptor> {
    BUILTIN_COLUMNS
        .iter()
        .map(|(name, path)| ColumnDescriptor::new(*name, FieldPath::dotted(path)))
        .collect()
}

/// Compile built-in plus custom field columns.
#[must_use]
pub fn compile(
    custom_fields: &[FieldMetadata],
    statuses: &[StatusMetadata],
    options: CompileOptions,
) -> Vec<ColumnDescriptor> {
    let mut columns = builtin_columns();
    let mut taken: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();
    let status_names = unique_status_names(statuses);
    let packed: HashSet<&str> = time_in_status_fields(custom_fields)
        .iter()
        .map(|field| field.id.as_str())
        .collect();

    for (index, field) in custom_fields.iter().enumerate() {
        let kind = if packed.contains(field.id.as_str()) {
            SchemaKind::TimeInStatus
        } else {
            field.schema.kind()
        };
        let earlier = BUILTIN_COLUMNS
            .iter()
            .filter(|(name, _)| *name == field.name)
            .count()
            + custom_fields[..index]
                .iter()
                .filter(|other| other.name == field.name)
                .count();

        let mut occurrence = earlier + 1;
        let mut generated = expand_field(
            field,
            kind,
            &suffixed(&field.name, occurrence),
            &status_names,
            options,
        );
        while generated.iter().any(|column| taken.contains(&column.name)) {
            occurrence = occurrence.max(1) + 1;
            generated = expand_field(
                field,
                kind,
                &suffixed(&field.name, occurrence),
                &status_names,
                options,
            );
        }

        tracing::debug!(
            field_id = %field.id,
            kind = %kind,
            columns = generated.len(),
            occurrence,
            "Compiled custom field"
        );

        for column in generated {
            taken.insert(column.name.clone());
            columns.push(column);
        }
    }

    columns
}

/// Keep only `requested` columns, in requested order.
///
/// Unknown names become placeholder columns. Repeated requested names are
/// collapsed to their first position.
#[must_use]
pub fn select_columns(columns: Vec<ColumnDescriptor>, requested: &[String]) -> ColumnSelection {
    let available: Vec<String> = columns.iter().map(|column| column.name.clone()).collect();
    let mut selected: Vec<ColumnDescriptor> = columns
        .into_iter()
        .filter(|column| requested.contains(&column.name))
        .collect();

    let mut missing: Vec<String> = Vec::new();
    for name in requested {
        if !selected.iter().any(|column| &column.name == name) && !missing.contains(name) {
            missing.push(name.clone());
        }
    }
    for name in &missing {
        let similar = find_similar_names(name, &available, 3);
        if similar.is_empty() {
            tracing::warn!(column = %name, "Requested column not found; it will be empty");
        } else {
            tracing::warn!(
                column = %name,
                did_you_mean = %similar.join(", "),
                "Requested column not found; it will be empty"
            );
        }
        selected.push(ColumnDescriptor::placeholder(name.clone()));
    }

    selected.sort_by_key(|column| {
        requested
            .iter()
            .position(|name| name == &column.name)
            .unwrap_or(usize::MAX)
    });

    ColumnSelection {
        columns: selected,
        missing,
    }
}

/// Fields holding packed time-in-status data.
///
/// Every field with the charting schema type qualifies. When there is none,
/// the first field carrying the plugin's display name stands in.
#[must_use]
pub fn time_in_status_fields(custom_fields: &[FieldMetadata]) -> Vec<&FieldMetadata> {
    let by_schema: Vec<&FieldMetadata> = custom_fields
        .iter()
        .filter(|field| field.schema.kind() == SchemaKind::TimeInStatus)
        .collect();
    if !by_schema.is_empty() {
        return by_schema;
    }
    custom_fields
        .iter()
        .find(|field| field.name == TIME_IN_STATUS_FIELD_NAME)
        .into_iter()
        .collect()
}

fn suffixed(name: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        name.to_string()
    } else {
        format!("{name} ({occurrence})")
    }
}

fn unique_status_names(statuses: &[StatusMetadata]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::with_capacity(statuses.len());
    for status in statuses {
        if !names.contains(&status.name.as_str()) {
            names.push(&status.name);
        }
    }
    names
}

fn field_path(field: &FieldMetadata, rest: &[&str]) -> FieldPath {
    FieldPath::from_segments(
        ["fields", field.id.as_str()]
            .into_iter()
            .chain(rest.iter().copied()),
    )
}

fn expand_field(
    field: &FieldMetadata,
    kind: SchemaKind,
    base: &str,
    status_names: &[&str],
    options: CompileOptions,
) -> Vec<ColumnDescriptor> {
    match kind {
        SchemaKind::User => vec![
            ColumnDescriptor::new(format!("{base} Name"), field_path(field, &["displayName"])),
            ColumnDescriptor::new(format!("{base} Email"), field_path(field, &["emailAddress"])),
        ],
        SchemaKind::UserArray => vec![
            ColumnDescriptor::new(format!("{base} Names"), field_path(field, &["displayName"])),
            ColumnDescriptor::new(
                format!("{base} Emails"),
                field_path(field, &["emailAddress"]),
            ),
        ],
        SchemaKind::Option | SchemaKind::OptionArray => {
            vec![ColumnDescriptor::new(base, field_path(field, &["value"]))]
        }
        SchemaKind::RequestLanguage => vec![
            ColumnDescriptor::new(format!("{base} Code"), field_path(field, &["languageCode"])),
            ColumnDescriptor::new(format!("{base} Name"), field_path(field, &["displayName"])),
        ],
        SchemaKind::Sla => vec![
            ColumnDescriptor::new(
                format!("{base}: Elapsed Time"),
                field_path(field, &["completedCycles", "elapsedTime", "millis"]),
            )
            .aggregated(Aggregate::Sum),
            ColumnDescriptor::new(
                format!("{base}: Goal Duration"),
                field_path(field, &["completedCycles", "goalDuration", "millis"]),
            )
            .aggregated(Aggregate::Max),
        ],
        SchemaKind::CustomerRequestType => vec![ColumnDescriptor::new(
            format!("{base}: Current Status"),
            field_path(field, &["currentStatus", "status"]),
        )],
        SchemaKind::TimeInStatus if options.expand_time_in_status => status_names
            .iter()
            .flat_map(|&status| {
                [
                    ColumnDescriptor::new(
                        format!("{base} Count: {status}"),
                        field_path(field, &[status, "count"]),
                    ),
                    ColumnDescriptor::new(
                        format!("{base} Duration: {status}"),
                        field_path(field, &[status, "duration"]),
                    ),
                ]
            })
            .collect(),
        SchemaKind::TimeInStatus | SchemaKind::Raw => {
            vec![ColumnDescriptor::new(base, field_path(field, &[]))]
        }
    }
}
