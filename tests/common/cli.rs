use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct CliRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl CliRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Scratch directory used as both cwd and `HOME`, so no real config leaks in.
pub struct Workspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    /// Write `./.jira-csv.yaml` in the workspace.
    pub fn write_project_config(&self, contents: &str) -> PathBuf {
        let path = self.root.join(".jira-csv.yaml");
        fs::write(&path, contents).expect("write project config");
        path
    }
}

pub fn run_cli<I, S>(workspace: &Workspace, args: I, label: &str) -> CliRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_cli_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_cli_with_env<I, S, E, K, V>(
    workspace: &Workspace,
    args: I,
    env_vars: E,
    label: &str,
) -> CliRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jira-csv"));
    cmd.current_dir(&workspace.root);
    for (key, _) in std::env::vars() {
        if key.starts_with("JIRA_") {
            cmd.env_remove(key);
        }
    }
    cmd.args(args);
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "jira_csv=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run jira-csv");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        SystemTime::now(),
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    CliRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// The JSON document at the end of mixed log/JSON output.
pub fn extract_json_payload(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    output.trim().to_string()
}

/// Parse CSV text into a header and records.
pub fn parse_csv(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .expect("csv headers")
        .iter()
        .map(ToString::to_string)
        .collect();
    let records = reader
        .records()
        .map(|record| {
            record
                .expect("csv record")
                .iter()
                .map(ToString::to_string)
                .collect()
        })
        .collect();
    (headers, records)
}

/// Cell at `column` of `record`, by header name.
pub fn cell<'a>(headers: &[String], record: &'a [String], column: &str) -> &'a str {
    let index = headers
        .iter()
        .position(|header| header == column)
        .unwrap_or_else(|| panic!("no column {column} in {headers:?}"));
    &record[index]
}
