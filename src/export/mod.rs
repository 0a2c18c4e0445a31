//! Export orchestration: metadata → columns → pages of issues → CSV.
//!
//! Metadata (custom fields, statuses) is fetched once up front. Pages are
//! then fetched strictly one after another; each page is flattened before
//! the next request is made.

use crate::client::{IssueQuery, JiraClient};
use crate::config::ExportSettings;
use crate::error::Result;
use crate::flatten::{FlattenOptions, FlattenWarning, Flattener, StatusIndex};
use crate::format::{CsvSink, write_csv};
use crate::model::{ColumnDescriptor, FieldMetadata, Row, StatusMetadata};
use crate::schema::{self, CompileOptions};
use crate::util::{ExportProgress, should_show_progress};
use std::collections::HashSet;
use std::io::Write;
use tracing::{debug, info, warn};

/// Everything needed to flatten issues, derived from instance metadata.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub columns: Vec<ColumnDescriptor>,
    pub statuses: StatusIndex,
    /// Custom fields holding packed time-in-status data.
    pub time_in_status_fields: Vec<String>,
    /// Requested names that matched no compiled column.
    pub missing_columns: Vec<String>,
}

impl ExportPlan {
    /// Compile and select columns from already fetched metadata.
    #[must_use]
    pub fn build(
        custom_fields: &[FieldMetadata],
        statuses: &[StatusMetadata],
        settings: &ExportSettings,
    ) -> Self {
        let compile_options = CompileOptions {
            expand_time_in_status: settings.flatten.expand_time_in_status,
        };
        let compiled = schema::compile(custom_fields, statuses, compile_options);

        let (columns, missing_columns) = match &settings.columns {
            Some(requested) => {
                let selection = schema::select_columns(compiled, requested);
                (selection.columns, selection.missing)
            }
            None => (compiled, Vec::new()),
        };

        let time_in_status_fields: Vec<String> = schema::time_in_status_fields(custom_fields)
            .into_iter()
            .map(|field| field.id.clone())
            .collect();
        debug!(
            columns = columns.len(),
            time_in_status_fields = ?time_in_status_fields,
            "Built export plan"
        );

        Self {
            columns,
            statuses: StatusIndex::new(statuses),
            time_in_status_fields,
            missing_columns,
        }
    }

    /// Fetch metadata and build the plan.
    ///
    /// Statuses are only requested when time-in-status expansion is on.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata request fails.
    pub fn fetch(client: &JiraClient, settings: &ExportSettings) -> Result<Self> {
        let custom_fields = client.fetch_custom_fields()?;
        let statuses = if settings.flatten.expand_time_in_status {
            client.fetch_statuses()?
        } else {
            Vec::new()
        };
        info!(
            custom_fields = custom_fields.len(),
            statuses = statuses.len(),
            "Fetched metadata"
        );
        Ok(Self::build(&custom_fields, &statuses, settings))
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    #[must_use]
    pub fn flattener<'a>(&'a self, options: &'a FlattenOptions) -> Flattener<'a> {
        Flattener::new(
            &self.columns,
            options,
            &self.statuses,
            &self.time_in_status_fields,
        )
    }
}

/// What an export produced.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Header actually written, after any empty-column drop.
    pub columns: Vec<String>,
    pub rows_written: usize,
    pub pages_fetched: usize,
    pub dropped_columns: Vec<String>,
    pub warnings: Vec<FlattenWarning>,
}

/// Columns whose every cell is empty. Nothing is empty when there are no rows.
#[must_use]
pub fn empty_columns(columns: &[String], rows: &[Row]) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }
    let mut filled = vec![false; columns.len()];
    for row in rows {
        for (flag, value) in filled.iter_mut().zip(row.values_for(columns)) {
            *flag |= !value.is_empty();
        }
    }
    columns
        .iter()
        .zip(filled)
        .filter(|(_, filled)| !filled)
        .map(|(column, _)| column.clone())
        .collect()
}

enum Output<W: Write> {
    Streaming(CsvSink<W>),
    Buffered { writer: W, rows: Vec<Row> },
}

impl<W: Write> Output<W> {
    fn push(&mut self, row: Row) -> Result<()> {
        match self {
            Self::Streaming(sink) => sink.write_row(&row),
            Self::Buffered { rows, .. } => {
                rows.push(row);
                Ok(())
            }
        }
    }
}

/// Run a full export and write CSV to `writer`.
///
/// # Errors
///
/// Returns an error if project and JQL conflict, a request fails, or the
/// output cannot be written. Per-issue decode problems are returned in
/// [`ExportSummary::warnings`] instead.
pub fn run_export<W: Write>(
    settings: &ExportSettings,
    client: &JiraClient,
    writer: W,
) -> Result<ExportSummary> {
    let query = IssueQuery::from_settings(settings)?;
    let plan = ExportPlan::fetch(client, settings)?;
    let flattener = plan.flattener(&settings.flatten);
    let column_names = plan.column_names();
    info!(columns = column_names.len(), jql = ?query.jql(), "Starting export");

    let mut output = if settings.drop_empty_columns {
        Output::Buffered {
            writer,
            rows: Vec::new(),
        }
    } else {
        Output::Streaming(CsvSink::new(writer, &column_names)?)
    };

    let mut summary = ExportSummary::default();
    let mut progress = ExportProgress::new(settings.max_issues, should_show_progress());
    let limit_reached = |rows: usize| settings.max_issues.is_some_and(|max| rows >= max);
    let mut start_at = settings.offset;

    'pages: for request in 0..client.settings().max_requests {
        if limit_reached(summary.rows_written) {
            break;
        }
        if request > 0 {
            client.pause();
        }

        let issues = client.fetch_issue_page(&query, start_at)?;
        summary.pages_fetched += 1;
        progress.page_fetched(issues.len());

        if issues.is_empty() {
            if request == 0 {
                warn!("No issues returned on the first page; did you forget to authenticate?");
            }
            break;
        }

        for issue in &issues {
            if limit_reached(summary.rows_written) {
                break 'pages;
            }
            let (row, warnings) = flattener.flatten(issue);
            for warning in &warnings {
                warn!(
                    issue_id = %warning.issue_id,
                    field_id = %warning.field_id,
                    error = %warning.error,
                    "Could not decode time in status; leaving cells empty"
                );
            }
            summary.warnings.extend(warnings);
            output.push(row)?;
            summary.rows_written += 1;
            progress.row_written();
        }

        start_at += issues.len();
    }
    progress.finish();

    match output {
        Output::Streaming(sink) => {
            sink.finish()?;
            summary.columns = column_names;
        }
        Output::Buffered { writer, mut rows } => {
            let dropped = empty_columns(&column_names, &rows);
            for column in &dropped {
                debug!(column = %column, "Dropping empty column");
            }
            for row in &mut rows {
                row.remove_columns(&dropped);
            }
            let dropped_set: HashSet<&str> = dropped.iter().map(String::as_str).collect();
            summary.columns = column_names
                .into_iter()
                .filter(|column| !dropped_set.contains(column.as_str()))
                .collect();
            write_csv(writer, &summary.columns, &rows)?;
            summary.dropped_columns = dropped;
        }
    }

    info!(
        rows = summary.rows_written,
        pages = summary.pages_fetched,
        warnings = summary.warnings.len(),
        "Export finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSchema, TIME_IN_STATUS_FIELD_NAME};

    fn row(cells: &[(&str, &str)]) -> Row {
        let mut row = Row::with_capacity(cells.len());
        for (column, value) in cells {
            row.push(*column, *value);
        }
        row
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn empty_columns_requires_every_cell_empty() {
        let columns = names(&["Key", "Team", "Points"]);
        let rows = vec![
            row(&[("Key", "ENG-1"), ("Team", ""), ("Points", "")]),
            row(&[("Key", "ENG-2"), ("Team", ""), ("Points", "3")]),
        ];
        assert_eq!(empty_columns(&columns, &rows), names(&["Team"]));
    }

    #[test]
    fn empty_columns_on_a_wide_schema() {
        let columns: Vec<String> = (0..1_500).map(|i| format!("Field {i}")).collect();
        let rows: Vec<Row> = (0..4)
            .map(|r| {
                let mut row = Row::with_capacity(columns.len());
                for (i, column) in columns.iter().enumerate() {
                    let value = if i % 3 == 0 || (i == 1 && r == 3) {
                        String::new()
                    } else {
                        format!("v{i}")
                    };
                    row.push(column.clone(), value);
                }
                row
            })
            .collect();

        let mut sparse = rows.clone();
        sparse[3].remove_columns(&["Field 2".to_string()]);

        let dropped = empty_columns(&columns, &sparse);
        assert_eq!(dropped.len(), 500);
        assert!(dropped.iter().all(|column| {
            column.trim_start_matches("Field ").parse::<usize>().is_ok_and(|i| i % 3 == 0)
        }));
        assert_eq!(empty_columns(&columns, &rows), dropped);
    }

    #[test]
    fn nothing_is_dropped_without_rows() {
        assert!(empty_columns(&names(&["Key"]), &[]).is_empty());
    }

    #[test]
    fn plan_selects_requested_columns() {
        let settings = ExportSettings {
            columns: Some(names(&["Key", "Nonexistent"])),
            ..ExportSettings::default()
        };
        let plan = ExportPlan::build(&[], &[], &settings);
        assert_eq!(plan.column_names(), names(&["Key", "Nonexistent"]));
        assert_eq!(plan.missing_columns, names(&["Nonexistent"]));
        assert!(plan.columns[1].is_placeholder());
    }

    #[test]
    fn plan_finds_time_in_status_fields() {
        let fields = vec![
            FieldMetadata::new("customfield_1", "Points", FieldSchema::new("number")),
            FieldMetadata::new("customfield_9", TIME_IN_STATUS_FIELD_NAME, FieldSchema::new("any")),
        ];
        let statuses = vec![StatusMetadata::new("1", "Open")];
        let settings = ExportSettings::default();
        let plan = ExportPlan::build(&fields, &statuses, &settings);
        assert_eq!(plan.time_in_status_fields, names(&["customfield_9"]));
        assert_eq!(plan.statuses.name("1"), Some("Open"));
        assert_eq!(plan.columns.len(), schema::BUILTIN_COLUMNS.len() + 2);
    }
}
