use clap::Parser;
use jira_csv::cli::commands;
use jira_csv::cli::{Cli, Commands};
use jira_csv::logging::init_logging;
use jira_csv::{JiraCsvError, StructuredError};
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = cli.overrides();

    let result = match &cli.command {
        Commands::Export(args) => commands::export::execute(args, cli.json, &overrides),
        Commands::Fields(args) => commands::fields::execute(args, cli.json, &overrides),
        Commands::Statuses => commands::statuses::execute(cli.json, &overrides),
        Commands::Columns(args) => commands::columns::execute(args, cli.json, &overrides),
        Commands::Completions(args) => commands::completions::execute(args),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Handle errors with structured output support.
///
/// When --json is set or stdout is not a TTY, outputs structured JSON to stderr.
/// Otherwise, outputs human-readable error with optional color.
fn handle_error(err: &JiraCsvError, json_mode: bool) -> ! {
    let structured = StructuredError::from_error(err);
    let exit_code = structured.code.exit_code();

    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let json = structured.to_json();
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        );
    } else {
        let use_color = io::stderr().is_terminal();
        eprintln!("{}", structured.to_human(use_color));
    }

    std::process::exit(exit_code);
}
