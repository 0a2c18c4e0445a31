//! Blocking Jira REST client.
//!
//! Every paginated endpoint is walked the same way: request `startAt = 0`,
//! advance by the number of items returned, stop on an empty page or after
//! `max_requests` requests. Consecutive requests of one walk are spaced by
//! the configured wait.

mod retry;

use crate::config::{ClientSettings, ExportSettings};
use crate::error::{JiraCsvError, Result};
use crate::model::{FieldMetadata, StatusMetadata};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, trace, warn};

pub use retry::{is_retryable_transport, parse_retry_after_ms, retry_delay_ms, should_retry_status};

pub const FIELD_SEARCH_PATH: &str = "/rest/api/3/field/search";
pub const STATUS_SEARCH_PATH: &str = "/rest/api/3/statuses/search";
pub const ISSUE_SEARCH_PATH: &str = "/rest/api/2/search";

/// Which issues to ask for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueQuery {
    jql: Option<String>,
}

impl IssueQuery {
    /// Every issue the account can see.
    #[must_use]
    pub const fn all() -> Self {
        Self { jql: None }
    }

    #[must_use]
    pub fn project(key: &str) -> Self {
        Self {
            jql: Some(format!("project = '{key}'")),
        }
    }

    #[must_use]
    pub fn raw(jql: impl Into<String>) -> Self {
        Self {
            jql: Some(jql.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `ConflictingQuery` when both a project and JQL are set.
    pub fn from_settings(settings: &ExportSettings) -> Result<Self> {
        match (&settings.project, &settings.jql) {
            (Some(_), Some(_)) => Err(JiraCsvError::ConflictingQuery),
            (Some(project), None) => Ok(Self::project(project)),
            (None, Some(jql)) => Ok(Self::raw(jql.clone())),
            (None, None) => Ok(Self::all()),
        }
    }

    #[must_use]
    pub fn jql(&self) -> Option<&str> {
        self.jql.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct ValuesPage<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct IssuesPage {
    #[serde(default)]
    issues: Vec<Value>,
}

/// Thin wrapper over a blocking `reqwest` client bound to one Jira site.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    settings: ClientSettings,
}

impl JiraClient {
    /// # Errors
    ///
    /// Returns an error if a configured header is not a valid HTTP header or
    /// the HTTP client cannot be built.
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let headers = default_headers(settings)?;
        let http = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .user_agent(concat!("jira-csv/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            settings: settings.clone(),
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Custom fields only, in fetch order.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails.
    pub fn fetch_custom_fields(&self) -> Result<Vec<FieldMetadata>> {
        self.fetch_fields(true)
    }

    /// All fields, or only custom ones. Duplicate ids keep their first
    /// occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails.
    pub fn fetch_fields(&self, custom_only: bool) -> Result<Vec<FieldMetadata>> {
        let params: &[(&str, &str)] = if custom_only {
            &[("type", "custom")]
        } else {
            &[]
        };
        let fields: Vec<FieldMetadata> = self.fetch_all_values(FIELD_SEARCH_PATH, params)?;

        let mut seen = HashSet::new();
        let fields: Vec<FieldMetadata> = fields
            .into_iter()
            .filter(|field| seen.insert(field.id.clone()))
            .collect();
        debug!(count = fields.len(), custom_only, "fetched fields");
        Ok(fields)
    }

    /// # Errors
    ///
    /// Returns an error if any request fails.
    pub fn fetch_statuses(&self) -> Result<Vec<StatusMetadata>> {
        let statuses: Vec<StatusMetadata> = self.fetch_all_values(STATUS_SEARCH_PATH, &[])?;
        debug!(count = statuses.len(), "fetched statuses");
        Ok(statuses)
    }

    /// One page of raw issue records starting at `start_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not JSON.
    pub fn fetch_issue_page(&self, query: &IssueQuery, start_at: usize) -> Result<Vec<Value>> {
        let mut params = Vec::with_capacity(2);
        if let Some(jql) = query.jql() {
            params.push(("jql", jql.to_string()));
        }
        params.push(("startAt", start_at.to_string()));

        let page: IssuesPage = self.get_json(ISSUE_SEARCH_PATH, &params)?;
        debug!(start_at, count = page.issues.len(), "fetched issue page");
        Ok(page.issues)
    }

    /// Sleep for the configured inter-request wait.
    pub fn pause(&self) {
        if !self.settings.wait.is_zero() {
            trace!(wait_ms = self.settings.wait.as_millis(), "sleeping between requests");
            std::thread::sleep(self.settings.wait);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.domain)
    }

    fn fetch_all_values<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut start_at = 0usize;

        for request in 0..self.settings.max_requests {
            if request > 0 {
                self.pause();
            }

            let mut query: Vec<(&str, String)> = params
                .iter()
                .map(|(key, value)| (*key, (*value).to_string()))
                .collect();
            query.push(("startAt", start_at.to_string()));

            let page: ValuesPage<T> = self.get_json(path, &query)?;
            if page.values.is_empty() {
                break;
            }
            start_at += page.values.len();
            results.extend(page.values);
        }

        Ok(results)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path);
        let max_attempts = self.settings.retry_max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            debug!(url = %url, ?query, attempt, "GET");
            match self.http.get(&url).query(query).send() {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let final_url = response.url().to_string();
                    debug!(url = %final_url, status, "response");

                    if response.status().is_success() {
                        let body = response.text()?;
                        return Ok(serde_json::from_str(&body)?);
                    }

                    let retry_after = parse_retry_after_ms(response.headers());
                    let body = response.text().unwrap_or_default();
                    if should_retry_status(status) && attempt < max_attempts {
                        self.backoff(attempt, retry_after, &final_url);
                        attempt += 1;
                        continue;
                    }
                    return Err(JiraCsvError::Http {
                        status,
                        url: final_url,
                        body,
                    });
                }
                Err(err) if is_retryable_transport(&err) && attempt < max_attempts => {
                    warn!(url = %url, error = %err, attempt, "transport error, retrying");
                    self.backoff(attempt, None, &url);
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn backoff(&self, attempt: u32, retry_after_ms: Option<u64>, url: &str) {
        let base = retry::BASE_BACKOFF_MS.min(duration_ms(self.settings.wait).max(1));
        let delay_ms = retry_delay_ms(base, attempt).max(retry_after_ms.unwrap_or(0));
        warn!(url, attempt, delay_ms, "request failed, backing off");
        std::thread::sleep(Duration::from_millis(delay_ms));
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_headers(settings: &ClientSettings) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in &settings.headers {
        let invalid = || JiraCsvError::InvalidHeader {
            header: format!("{name}: {value}"),
        };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(name, value);
    }

    if let (Some(email), Some(token)) = (&settings.user_email, &settings.api_token) {
        let encoded = STANDARD.encode(format!("{email}:{token}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|_| {
            JiraCsvError::invalid_setting("user-email", email.clone(), "not a valid header value")
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}
