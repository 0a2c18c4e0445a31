use crate::cli::commands::connect;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{render_table, terminal_width};

/// Execute the statuses command.
///
/// # Errors
///
/// Returns an error if settings are invalid or a request fails.
pub fn execute(json: bool, cli: &CliOverrides) -> Result<()> {
    let (_, client) = connect(cli)?;
    let statuses = client.fetch_statuses()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|status| vec![status.id.clone(), status.name.clone()])
        .collect();
    print!("{}", render_table(&["ID", "NAME"], &rows, terminal_width()));
    Ok(())
}
