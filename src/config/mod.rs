//! Configuration management for `jira_csv`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`JIRA_CSV_*`, `JIRA_DOMAIN`, `JIRA_USER_EMAIL`, `JIRA_API_TOKEN`)
//! 3. Project config (`--config <path>` or `./.jira-csv.yaml`)
//! 4. User config (`~/.config/jira-csv/config.yaml`)
//! 5. Defaults

use crate::error::{JiraCsvError, Result};
use crate::flatten::{DEFAULT_SUBDELIMITER, FlattenOptions};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project config filename looked up in the working directory.
pub const PROJECT_CONFIG_FILENAME: &str = ".jira-csv.yaml";

const ENV_PREFIX: &str = "JIRA_CSV_";

/// Separator used when a list value is stored in a single layer entry.
const LIST_SEPARATOR: char = '\n';

/// One source of configuration values, keyed by normalised name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs shaped like environment variables.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        let mut shorthand = Vec::new();

        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
                continue;
            }
            match key.as_str() {
                "JIRA_DOMAIN" => shorthand.push(("domain", value)),
                "JIRA_USER_EMAIL" => shorthand.push(("user-email", value)),
                "JIRA_API_TOKEN" => shorthand.push(("api-token", value)),
                _ => {}
            }
        }

        // Prefixed variables beat the short Jira names.
        for (key, value) in shorthand {
            if layer.get(key).is_none() {
                layer.insert(key, value);
            }
        }

        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit project config file.
    pub config: Option<PathBuf>,
    pub domain: Option<String>,
    pub user_email: Option<String>,
    pub api_token: Option<String>,
    pub headers: Vec<String>,
    pub wait_ms: Option<u64>,
    pub max_requests: Option<usize>,
    pub project: Option<String>,
    pub jql: Option<String>,
    pub columns: Vec<String>,
    pub expand_time_in_status: Option<bool>,
    pub max_description_length: Option<usize>,
    pub subdelimiter: Option<String>,
    pub remove_new_lines: Option<bool>,
    pub sort: Option<bool>,
    pub unique: Option<bool>,
    pub drop_empty_columns: Option<bool>,
    pub max_issues: Option<usize>,
    pub offset: Option<usize>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        let strings = [
            ("domain", &self.domain),
            ("user-email", &self.user_email),
            ("api-token", &self.api_token),
            ("project", &self.project),
            ("jql", &self.jql),
            ("subdelimiter", &self.subdelimiter),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                layer.insert(key, value.clone());
            }
        }

        let flags = [
            ("expand-time-in-status", self.expand_time_in_status),
            ("remove-new-lines", self.remove_new_lines),
            ("sort", self.sort),
            ("unique", self.unique),
            ("drop-empty-columns", self.drop_empty_columns),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                layer.insert(key, value.to_string());
            }
        }

        let numbers = [
            ("max-requests", self.max_requests),
            ("max-description-length", self.max_description_length),
            ("max-issues", self.max_issues),
            ("offset", self.offset),
        ];
        for (key, value) in numbers {
            if let Some(value) = value {
                layer.insert(key, value.to_string());
            }
        }
        if let Some(wait_ms) = self.wait_ms {
            layer.insert("wait-ms", wait_ms.to_string());
        }

        if !self.headers.is_empty() {
            layer.insert("headers", join_list(&self.headers));
        }
        if !self.columns.is_empty() {
            layer.insert("columns", join_list(&self.columns));
        }

        layer
    }
}

/// Load the project config: the explicit path when given, else `./.jira-csv.yaml`.
///
/// # Errors
///
/// Returns an error if an explicit path does not exist, or a file cannot be
/// read or parsed.
pub fn load_project_config(explicit: Option<&Path>) -> Result<ConfigLayer> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(JiraCsvError::invalid_setting(
                    "config",
                    path.display().to_string(),
                    "file not found",
                ));
            }
            ConfigLayer::from_yaml(path)
        }
        None => ConfigLayer::from_yaml(Path::new(PROJECT_CONFIG_FILENAME)),
    }
}

/// Path of the user config file, if `HOME` is set.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(
        Path::new(&home)
            .join(".config")
            .join("jira-csv")
            .join("config.yaml"),
    )
}

/// Load user config (`~/.config/jira-csv/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    match user_config_path() {
        Some(path) => ConfigLayer::from_yaml(&path),
        None => Ok(ConfigLayer::default()),
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.insert("subdelimiter", DEFAULT_SUBDELIMITER);
    layer.insert("sort", "true");
    layer.insert("offset", "0");
    layer.insert("max-requests", "1000");
    layer.insert("wait-ms", "2000");
    layer.insert("retry-max-attempts", "3");
    layer.insert("request-timeout-ms", "30000");
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = load_project_config(cli.config.as_deref())?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Connection settings shared by every command that talks to Jira.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Base URL, without a trailing slash.
    pub domain: String,
    pub user_email: Option<String>,
    pub api_token: Option<String>,
    pub headers: Vec<(String, String)>,
    pub wait: Duration,
    pub max_requests: usize,
    pub retry_max_attempts: u32,
    pub request_timeout: Duration,
}

impl ClientSettings {
    /// # Errors
    ///
    /// Returns an error if `domain` is missing, a header is malformed, or a
    /// numeric setting does not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let domain = string_value(layer, "domain")
            .map(|domain| domain.trim_end_matches('/').to_string())
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| JiraCsvError::MissingSetting {
                key: "domain".to_string(),
            })?;

        let headers = list_value(layer, "headers")
            .iter()
            .map(|raw| parse_header(raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            domain,
            user_email: string_value(layer, "user-email"),
            api_token: string_value(layer, "api-token"),
            headers,
            wait: Duration::from_millis(parse_number(layer, "wait-ms")?.unwrap_or(2000)),
            max_requests: parse_number(layer, "max-requests")?.unwrap_or(1000),
            retry_max_attempts: parse_number(layer, "retry-max-attempts")?.unwrap_or(3),
            request_timeout: Duration::from_millis(
                parse_number(layer, "request-timeout-ms")?.unwrap_or(30_000),
            ),
        })
    }

    /// Both credentials present, so requests carry basic auth.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.user_email.is_some() && self.api_token.is_some()
    }
}

/// What to export and how to shape it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub project: Option<String>,
    pub jql: Option<String>,
    /// Requested column names, in output order.
    pub columns: Option<Vec<String>>,
    pub flatten: FlattenOptions,
    pub drop_empty_columns: bool,
    pub max_issues: Option<usize>,
    pub offset: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            project: None,
            jql: None,
            columns: None,
            flatten: FlattenOptions::default(),
            drop_empty_columns: false,
            max_issues: None,
            offset: 0,
        }
    }
}

impl ExportSettings {
    /// # Errors
    ///
    /// Returns an error if a boolean or numeric setting does not parse.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let columns = list_value(layer, "columns");
        let flatten = FlattenOptions {
            subdelimiter: layer
                .get("subdelimiter")
                .unwrap_or(DEFAULT_SUBDELIMITER)
                .to_string(),
            remove_new_lines: bool_value(layer, "remove-new-lines")?.unwrap_or(false),
            sort: bool_value(layer, "sort")?.unwrap_or(true),
            unique: bool_value(layer, "unique")?.unwrap_or(false),
            max_description_length: parse_number(layer, "max-description-length")?,
            expand_time_in_status: bool_value(layer, "expand-time-in-status")?.unwrap_or(false),
        };

        Ok(Self {
            project: string_value(layer, "project"),
            jql: string_value(layer, "jql"),
            columns: (!columns.is_empty()).then_some(columns),
            flatten,
            drop_empty_columns: bool_value(layer, "drop-empty-columns")?.unwrap_or(false),
            max_issues: parse_number(layer, "max-issues")?,
            offset: parse_number(layer, "offset")?.unwrap_or(0),
        })
    }
}

/// Split a `Name: value` header.
///
/// # Errors
///
/// Returns `InvalidHeader` when there is no colon or the name is empty.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let invalid = || JiraCsvError::InvalidHeader {
        header: raw.to_string(),
    };
    let (name, value) = raw.split_once(':').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn join_list(values: &[String]) -> String {
    values.join(&LIST_SEPARATOR.to_string())
}

/// Lists arrive newline-joined from YAML/CLI or comma-separated from env.
fn list_value(layer: &ConfigLayer, key: &str) -> Vec<String> {
    let Some(raw) = layer.get(key) else {
        return Vec::new();
    };
    let separator = if raw.contains(LIST_SEPARATOR) {
        LIST_SEPARATOR
    } else {
        ','
    };
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn string_value(layer: &ConfigLayer, key: &str) -> Option<String> {
    layer
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn bool_value(layer: &ConfigLayer, key: &str) -> Result<Option<bool>> {
    layer
        .get(key)
        .map(|raw| {
            parse_bool(raw)
                .ok_or_else(|| JiraCsvError::invalid_setting(key, raw, "expected a boolean"))
        })
        .transpose()
}

fn parse_number<T: std::str::FromStr>(layer: &ConfigLayer, key: &str) -> Result<Option<T>> {
    match layer.get(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            JiraCsvError::invalid_setting(key, raw, "expected a non-negative integer")
        }),
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.insert(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let items: Vec<String> = values.iter().filter_map(yaml_scalar_to_string).collect();
            out.insert(prefix.to_string(), join_list(&items));
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
