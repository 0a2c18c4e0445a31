//! Canned Jira responses served by `httpmock`.

use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use jira_csv::client::{FIELD_SEARCH_PATH, ISSUE_SEARCH_PATH, STATUS_SEARCH_PATH};
use serde_json::{Value, json};

pub const TIME_IN_STATUS_ID: &str = "customfield_10200";

/// Serve `values` as a single `{ "values": [...] }` page, then an empty page.
pub fn mock_values<'a>(server: &'a MockServer, path: &str, values: &Value) -> Vec<Mock<'a>> {
    let count = values.as_array().map_or(0, Vec::len);
    let first = server.mock(|when, then| {
        when.method(GET).path(path).query_param("startAt", "0");
        then.status(200).json_body(json!({ "values": values }));
    });
    let last = server.mock(|when, then| {
        when.method(GET)
            .path(path)
            .query_param("startAt", count.to_string());
        then.status(200).json_body(json!({ "values": [] }));
    });
    vec![first, last]
}

pub fn mock_custom_fields<'a>(server: &'a MockServer, fields: &Value) -> Vec<Mock<'a>> {
    mock_values(server, FIELD_SEARCH_PATH, fields)
}

pub fn mock_statuses<'a>(server: &'a MockServer, statuses: &Value) -> Vec<Mock<'a>> {
    mock_values(server, STATUS_SEARCH_PATH, statuses)
}

/// Serve `pages` of issues back to back starting at `offset`, followed by an
/// empty page.
pub fn mock_issue_pages<'a>(server: &'a MockServer, offset: usize, pages: &[Value]) -> Vec<Mock<'a>> {
    let mut mocks = Vec::with_capacity(pages.len() + 1);
    let mut start_at = offset;
    for page in pages {
        let len = page.as_array().map_or(0, Vec::len);
        mocks.push(server.mock(|when, then| {
            when.method(GET)
                .path(ISSUE_SEARCH_PATH)
                .query_param("startAt", start_at.to_string());
            then.status(200)
                .json_body(json!({ "startAt": start_at, "issues": page }));
        }));
        start_at += len;
    }
    mocks.push(server.mock(|when, then| {
        when.method(GET)
            .path(ISSUE_SEARCH_PATH)
            .query_param("startAt", start_at.to_string());
        then.status(200)
            .json_body(json!({ "startAt": start_at, "issues": [] }));
    }));
    mocks
}

pub fn custom_fields() -> Value {
    json!([
        {
            "id": "customfield_10010",
            "name": "Story Points",
            "schema": {"type": "number", "custom": "com.atlassian.jira.plugin.system.customfieldtypes:float"}
        },
        {
            "id": "customfield_10020",
            "name": "Team",
            "schema": {"type": "option", "custom": "com.atlassian.jira.plugin.system.customfieldtypes:select"}
        },
        {
            "id": "customfield_10030",
            "name": "Reviewers",
            "schema": {"type": "array", "items": "user"}
        },
        {
            "id": TIME_IN_STATUS_ID,
            "name": "[CHART] Time in Status",
            "schema": {"type": "any", "custom": "com.atlassian.jira.ext.charting:timeinstatus"}
        }
    ])
}

pub fn statuses() -> Value {
    json!([
        {"id": "1", "name": "Open"},
        {"id": "3", "name": "In Progress"},
        {"id": "10001", "name": "Done"}
    ])
}

pub fn issue(n: usize) -> Value {
    json!({
        "id": format!("{}", 10_000 + n),
        "key": format!("ENG-{n}"),
        "self": format!("https://acme.atlassian.net/rest/api/2/issue/{}", 10_000 + n),
        "fields": {
            "created": "2024-01-02T03:04:05.000+0000",
            "summary": format!("Issue number {n}"),
            "description": "First line\nsecond line",
            "labels": ["frontend", "backend"],
            "assignee": {"displayName": "Ada Lovelace", "emailAddress": "ada@acme.test"},
            "issuetype": {"name": "Bug", "description": "A problem"},
            "project": {"id": "10000", "key": "ENG", "name": "Engineering"},
            "customfield_10010": 5,
            "customfield_10020": {"value": "Platform"},
            "customfield_10030": [
                {"displayName": "Grace", "emailAddress": "grace@acme.test"},
                {"displayName": "Alan", "emailAddress": "alan@acme.test"}
            ],
            TIME_IN_STATUS_ID: "1_*:*_1_*:*_3600000_*|*_10001_*:*_2_*:*_120000"
        }
    })
}

pub fn issues(range: std::ops::Range<usize>) -> Value {
    Value::Array(range.map(issue).collect())
}
