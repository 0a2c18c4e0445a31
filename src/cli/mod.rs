//! CLI definitions and entry point.

use crate::config::CliOverrides;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Export Jira issues, custom fields and SLA data to CSV
#[derive(Parser, Debug)]
#[command(name = "jira-csv", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./.jira-csv.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also append JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// How to reach the Jira site.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Jira base URL, e.g. https://acme.atlassian.net
    #[arg(long, global = true)]
    pub domain: Option<String>,

    /// Account email for basic auth
    #[arg(long, global = true)]
    pub user_email: Option<String>,

    /// API token for basic auth
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// Extra request header as 'Name: value' (repeatable)
    #[arg(long = "header", global = true)]
    pub headers: Vec<String>,

    /// Milliseconds to wait between paginated requests
    #[arg(long, global = true)]
    pub wait_ms: Option<u64>,

    /// Maximum requests per paginated walk
    #[arg(long, global = true)]
    pub max_requests: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export issues as CSV
    Export(ExportArgs),

    /// List fields known to the Jira instance
    Fields(FieldsArgs),

    /// List workflow statuses
    Statuses,

    /// Show the CSV columns an export would produce
    Columns(ColumnsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Column shaping shared by `export` and `columns`.
#[derive(Args, Debug, Clone, Default)]
pub struct ColumnSelectionArgs {
    /// Only these columns, in this order (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Expand the time-in-status field into per-status count/duration columns
    #[arg(long)]
    pub expand_time_in_status: bool,
}

/// Arguments for the export command.
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExportArgs {
    #[command(flatten)]
    pub selection: ColumnSelectionArgs,

    /// Only issues from this project key (not with --jql)
    #[arg(long)]
    pub project: Option<String>,

    /// Raw JQL query
    #[arg(long)]
    pub jql: Option<String>,

    /// Stop after this many issues
    #[arg(long)]
    pub max_issues: Option<usize>,

    /// Skip this many issues
    #[arg(long)]
    pub offset: Option<usize>,

    /// Truncate descriptions to this many characters
    #[arg(long)]
    pub max_description_length: Option<usize>,

    /// Joins multiple values in one cell
    #[arg(long)]
    pub subdelimiter: Option<String>,

    /// Replace line breaks inside cells with spaces
    #[arg(long)]
    pub remove_new_lines: bool,

    /// Keep multi-value cells in API order
    #[arg(long)]
    pub no_sort: bool,

    /// Drop repeated values within a cell
    #[arg(long)]
    pub unique: bool,

    /// Remove columns that are empty for every exported issue
    #[arg(long)]
    pub drop_empty_columns: bool,

    /// Write CSV here instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the fields command.
#[derive(Args, Debug, Clone, Default)]
pub struct FieldsArgs {
    /// Only custom fields
    #[arg(long)]
    pub custom: bool,
}

/// Arguments for the columns command.
#[derive(Args, Debug, Clone, Default)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub selection: ColumnSelectionArgs,
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    /// Elvish
    Elvish,
}

impl Cli {
    /// Overrides from global flags; subcommands add their own on top.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config: self.config.clone(),
            domain: self.connection.domain.clone(),
            user_email: self.connection.user_email.clone(),
            api_token: self.connection.api_token.clone(),
            headers: self.connection.headers.clone(),
            wait_ms: self.connection.wait_ms,
            max_requests: self.connection.max_requests,
            ..CliOverrides::default()
        }
    }
}

/// `Some(true)` for a set flag, `None` so config can decide otherwise.
const fn flag(set: bool) -> Option<bool> {
    if set { Some(true) } else { None }
}

impl ColumnSelectionArgs {
    pub fn apply(&self, overrides: &mut CliOverrides) {
        overrides.columns.clone_from(&self.columns);
        overrides.expand_time_in_status = flag(self.expand_time_in_status);
    }
}

impl ExportArgs {
    pub fn apply(&self, overrides: &mut CliOverrides) {
        self.selection.apply(overrides);
        overrides.project.clone_from(&self.project);
        overrides.jql.clone_from(&self.jql);
        overrides.max_issues = self.max_issues;
        overrides.offset = self.offset;
        overrides.max_description_length = self.max_description_length;
        overrides.subdelimiter.clone_from(&self.subdelimiter);
        overrides.remove_new_lines = flag(self.remove_new_lines);
        overrides.sort = if self.no_sort { Some(false) } else { None };
        overrides.unique = flag(self.unique);
        overrides.drop_empty_columns = flag(self.drop_empty_columns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn export_flags_become_overrides() {
        let cli = Cli::parse_from([
            "jira-csv",
            "--domain",
            "https://acme.atlassian.net",
            "--header",
            "X-Trace: on",
            "export",
            "--project",
            "ENG",
            "--columns",
            "Key,Summary",
            "--no-sort",
            "--unique",
            "--max-issues",
            "5",
        ]);
        let Commands::Export(args) = &cli.command else {
            panic!("expected export");
        };

        let mut overrides = cli.overrides();
        args.apply(&mut overrides);

        assert_eq!(overrides.domain.as_deref(), Some("https://acme.atlassian.net"));
        assert_eq!(overrides.headers, vec!["X-Trace: on".to_string()]);
        assert_eq!(overrides.project.as_deref(), Some("ENG"));
        assert_eq!(overrides.columns, vec!["Key".to_string(), "Summary".to_string()]);
        assert_eq!(overrides.sort, Some(false));
        assert_eq!(overrides.unique, Some(true));
        assert_eq!(overrides.remove_new_lines, None);
        assert_eq!(overrides.max_issues, Some(5));
    }

    #[test]
    fn project_and_jql_both_reach_settings() {
        // The conflict is reported by the export itself so it carries a
        // structured error code.
        let cli = Cli::parse_from([
            "jira-csv",
            "export",
            "--project",
            "ENG",
            "--jql",
            "status = Done",
        ]);
        let Commands::Export(args) = &cli.command else {
            panic!("expected export");
        };
        assert!(args.project.is_some() && args.jql.is_some());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["jira-csv", "statuses", "-vv", "--json", "--wait-ms", "0"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.connection.wait_ms, Some(0));
    }
}
