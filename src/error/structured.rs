//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::JiraCsvError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === HTTP Errors (exit code 2) ===
    /// Credentials rejected (401)
    Unauthorized,
    /// Authenticated but not allowed (403)
    Forbidden,
    /// Endpoint or resource not found (404)
    NotFound,
    /// Rate limited (429)
    RateLimited,
    /// Server side failure (5xx)
    ServerError,
    /// Any other unexpected HTTP status
    HttpError,
    /// Connection, TLS or timeout failure
    TransportError,

    // === Validation Errors (exit code 4) ===
    /// Project and JQL both supplied
    ConflictingQuery,
    /// Required setting missing
    MissingSetting,
    /// Setting has an unusable value
    InvalidSetting,
    /// Extra header malformed
    InvalidHeader,

    // === Data Errors (exit code 6) ===
    /// Time in status value could not be decoded
    DecodeError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,
    /// CSV writer error
    CsvError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            // HTTP
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::TransportError => "TRANSPORT_ERROR",
            // Validation
            Self::ConflictingQuery => "CONFLICTING_QUERY",
            Self::MissingSetting => "MISSING_SETTING",
            Self::InvalidSetting => "INVALID_SETTING",
            Self::InvalidHeader => "INVALID_HEADER",
            // Data
            Self::DecodeError => "DECODE_ERROR",
            // I/O
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::CsvError => "CSV_ERROR",
            // Internal
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Retryable means the caller might succeed if it:
    /// - Waits and retries (e.g., rate limited, server error)
    /// - Fixes the input and retries (e.g., invalid setting)
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited
                | Self::ServerError
                | Self::TransportError
                | Self::ConflictingQuery
                | Self::MissingSetting
                | Self::InvalidSetting
                | Self::InvalidHeader
        )
    }

    /// Get the exit code for this error category.
    ///
    /// Exit codes are grouped by error category:
    /// - 1: Internal/unknown errors
    /// - 2: HTTP/transport errors
    /// - 4: Validation errors
    /// - 6: Data errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Unauthorized
            | Self::Forbidden
            | Self::NotFound
            | Self::RateLimited
            | Self::ServerError
            | Self::HttpError
            | Self::TransportError => 2,
            Self::ConflictingQuery
            | Self::MissingSetting
            | Self::InvalidSetting
            | Self::InvalidHeader => 4,
            Self::DecodeError => 6,
            Self::IoError | Self::JsonError | Self::YamlError | Self::CsvError => 8,
            Self::InternalError => 1,
        }
    }

    const fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::ServerError,
            _ => Self::HttpError,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `JiraCsvError`.
    #[must_use]
    pub fn from_error(err: &JiraCsvError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(ToString::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &JiraCsvError) -> (ErrorCode, Option<Value>) {
        match err {
            JiraCsvError::Http { status, url, body } => (
                ErrorCode::from_http_status(*status),
                Some(json!({
                    "status": status,
                    "url": url,
                    "body": truncate_for_context(body),
                })),
            ),
            JiraCsvError::Transport(source) => (
                ErrorCode::TransportError,
                source.url().map(|url| json!({"url": url.as_str()})),
            ),
            JiraCsvError::InvalidHeader { header } => {
                (ErrorCode::InvalidHeader, Some(json!({"header": header})))
            }
            JiraCsvError::ConflictingQuery => (ErrorCode::ConflictingQuery, None),
            JiraCsvError::MissingSetting { key } => {
                (ErrorCode::MissingSetting, Some(json!({"key": key})))
            }
            JiraCsvError::InvalidSetting { key, value, reason } => (
                ErrorCode::InvalidSetting,
                Some(json!({"key": key, "value": value, "reason": reason})),
            ),
            JiraCsvError::Decode(_) => (ErrorCode::DecodeError, None),
            JiraCsvError::Io(_) => (ErrorCode::IoError, None),
            JiraCsvError::Json(_) => (ErrorCode::JsonError, None),
            JiraCsvError::Yaml(_) => (ErrorCode::YamlError, None),
            JiraCsvError::Csv(_) => (ErrorCode::CsvError, None),
            JiraCsvError::WithContext { context, source } => {
                let code = if source.is::<std::io::Error>() {
                    ErrorCode::IoError
                } else {
                    ErrorCode::InternalError
                };
                (code, Some(json!({"context": context})))
            }
            JiraCsvError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}

fn truncate_for_context(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 500;
    if body.chars().count() <= MAX_BODY_CHARS {
        body.to_string()
    } else {
        let mut truncated: String = body.chars().take(MAX_BODY_CHARS).collect();
        truncated.push_str("...");
        truncated
    }
}

/// Calculate the Levenshtein distance between two strings.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Find column names similar to a requested one (case-insensitive).
///
/// Returns up to `max_suggestions` names with distance <= 3.
#[must_use]
pub fn find_similar_names(
    searched: &str,
    existing: &[String],
    max_suggestions: usize,
) -> Vec<String> {
    let searched = searched.to_lowercase();
    let mut candidates: Vec<(usize, &str)> = existing
        .iter()
        .map(|name| (levenshtein_distance(&searched, &name.to_lowercase()), name.as_str()))
        .filter(|(dist, _)| *dist <= 3)
        .collect();

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    candidates
        .into_iter()
        .take(max_suggestions)
        .map(|(_, name)| name.to_string())
        .collect()
}
