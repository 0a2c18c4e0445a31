use crate::cli::FieldsArgs;
use crate::cli::commands::connect;
use crate::config::CliOverrides;
use crate::error::Result;
use crate::format::{render_table, terminal_width};
use crate::model::FieldSchema;

/// Execute the fields command.
///
/// # Errors
///
/// Returns an error if settings are invalid or a request fails.
pub fn execute(args: &FieldsArgs, json: bool, cli: &CliOverrides) -> Result<()> {
    let (_, client) = connect(cli)?;
    let fields = client.fetch_fields(args.custom)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = fields
        .iter()
        .map(|field| {
            vec![
                field.id.clone(),
                describe_schema(&field.schema),
                field.name.clone(),
            ]
        })
        .collect();
    print!("{}", render_table(&["ID", "TYPE", "NAME"], &rows, terminal_width()));
    Ok(())
}

/// `array<user>` style summary of a field schema.
fn describe_schema(schema: &FieldSchema) -> String {
    match &schema.items {
        Some(items) => format!("{}<{items}>", schema.type_),
        None => schema.type_.clone(),
    }
}
