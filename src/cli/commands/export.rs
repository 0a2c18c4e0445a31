use crate::cli::ExportArgs;
use crate::client::{IssueQuery, JiraClient};
use crate::config::{self, ClientSettings, CliOverrides, ExportSettings};
use crate::error::{JiraCsvError, Result};
use crate::export::{ExportSummary, run_export};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct ExportOutput<'a> {
    rows: usize,
    pages: usize,
    columns: &'a [String],
    dropped_columns: &'a [String],
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl<'a> ExportOutput<'a> {
    fn new(summary: &'a ExportSummary, output: Option<&Path>) -> Self {
        Self {
            rows: summary.rows_written,
            pages: summary.pages_fetched,
            columns: &summary.columns,
            dropped_columns: &summary.dropped_columns,
            warnings: summary.warnings.iter().map(ToString::to_string).collect(),
            output: output.map(|path| path.display().to_string()),
        }
    }
}

/// Execute the export command.
///
/// CSV goes to `--output` or stdout. The summary (JSON with `--json`) goes
/// to stdout only when CSV does not.
///
/// # Errors
///
/// Returns an error if settings are invalid, a request fails, or the output
/// cannot be written.
pub fn execute(args: &ExportArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut overrides = cli.clone();
    args.apply(&mut overrides);

    let layer = config::load_config(&overrides)?;
    let settings = ExportSettings::from_layer(&layer)?;
    IssueQuery::from_settings(&settings)?;
    let client = JiraClient::new(&ClientSettings::from_layer(&layer)?)?;

    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                JiraCsvError::with_context(format!("creating {}", path.display()), err)
            })?;
            let writer = BufWriter::new(file);
            run_export(&settings, &client, writer)?
        }
        None => {
            let stdout = io::stdout();
            let summary = run_export(&settings, &client, stdout.lock())?;
            stdout.lock().flush()?;
            summary
        }
    };

    let output = ExportOutput::new(&summary, args.output.as_deref());
    match (&args.output, json) {
        (Some(_), true) => println!("{}", serde_json::to_string_pretty(&output)?),
        (None, true) => eprintln!("{}", serde_json::to_string(&output)?),
        (Some(path), false) => println!(
            "Exported {} issues ({} columns) to {}",
            summary.rows_written,
            summary.columns.len(),
            path.display()
        ),
        (None, false) => {}
    }
    info!(
        rows = summary.rows_written,
        dropped = summary.dropped_columns.len(),
        "Export command complete"
    );

    Ok(())
}
