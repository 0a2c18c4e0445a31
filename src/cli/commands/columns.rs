//! `columns`: preview the CSV header without fetching any issues.

use crate::cli::ColumnsArgs;
use crate::cli::commands::connect;
use crate::config::{CliOverrides, ExportSettings};
use crate::error::Result;
use crate::export::ExportPlan;
use crate::format::{render_table, terminal_width};
use crate::model::ColumnDescriptor;

/// Execute the columns command.
///
/// # Errors
///
/// Returns an error if settings are invalid or a metadata request fails.
pub fn execute(args: &ColumnsArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let mut overrides = cli.clone();
    args.selection.apply(&mut overrides);

    let (layer, client) = connect(&overrides)?;
    let settings = ExportSettings::from_layer(&layer)?;
    let plan = ExportPlan::fetch(&client, &settings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.columns)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = plan.columns.iter().map(column_row).collect();
    print!(
        "{}",
        render_table(&["NAME", "AGGREGATE", "PATH"], &rows, terminal_width())
    );
    Ok(())
}

fn column_row(column: &ColumnDescriptor) -> Vec<String> {
    vec![
        column.name.clone(),
        column
            .aggregate
            .map(|aggregate| aggregate.to_string())
            .unwrap_or_default(),
        column
            .path
            .as_ref()
            .map_or_else(|| "(not found)".to_string(), ToString::to_string),
    ]
}
