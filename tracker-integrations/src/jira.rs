//! Jira Cloud over its REST API (v3).
//!
//! Offers the issues matched by the configured JQL filter as tasks, and logs
//! work against an issue when the submitted task starts with its key.

use crate::error::IntegrationError;
use crate::http::{expect_status, http_client};
use chrono::NaiveDateTime;
use daily_tracker_runtime::{Configuration, Consumer, Entry, JiraCredentials, PluginFuture, Producer, Task};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Search pages fetched per popup at most.
const MAX_PAGES: usize = 5;
const PAGE_SIZE: usize = 50;

/// Jira wants a fixed offset even though popup times are local.
const WORKLOG_STARTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000+0000";

/// Find the issue key at the start of a task name, e.g. `PROJ-123` in
/// `PROJ-123 Fix login`.
///
/// A key is an uppercase ASCII letter, one to nine ASCII letters, digits or
/// underscores, a dash and at least one digit.
pub fn issue_key(task: &str) -> Option<&str> {
    let mut chars = task.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_uppercase() => {}
        _ => return None,
    }

    let mut word_chars = 0;
    let mut end = None;
    let mut digits = 0;
    for (i, c) in chars {
        if end.is_none() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word_chars += 1;
                if word_chars > 9 {
                    return None;
                }
                continue;
            }
            if c != '-' || word_chars == 0 {
                return None;
            }
            end = Some(i + 1);
            continue;
        }
        if c.is_ascii_digit() {
            digits += 1;
            end = Some(i + 1);
        } else {
            break;
        }
    }

    match end {
        Some(end) if digits > 0 => Some(&task[..end]),
        _ => None,
    }
}

pub struct Jira {
    client: reqwest::Client,
    base_url: String,
    credentials: JiraCredentials,
}

impl Jira {
    pub fn new(credentials: &JiraCredentials, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: format!("https://{}.atlassian.net/rest/api/3", credentials.domain),
            credentials: credentials.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, method: reqwest::Method, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, endpoint))
            .basic_auth(&self.credentials.key, Some(&self.credentials.secret))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// `KEY summary` for every issue matched by `jql`.
    pub async fn tickets_in_sprint(&self, jql: &str) -> Result<Vec<String>, IntegrationError> {
        let mut tickets = Vec::new();

        for _ in 0..MAX_PAGES {
            let start_at = tickets.len().to_string();
            let max_results = PAGE_SIZE.to_string();
            let response = self
                .request(reqwest::Method::GET, "search")
                .query(&[
                    ("jql", jql),
                    ("fields", "summary,duedate,assignee"),
                    ("startAt", start_at.as_str()),
                    ("maxResults", max_results.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            let page: SearchPage = response.json().await?;
            if !page.error_messages.is_empty() || !status.is_success() {
                return Err(IntegrationError::Api {
                    service: "Jira",
                    status: status.as_u16(),
                    body: page.error_messages.join(" "),
                });
            }

            let received = page.issues.len();
            tickets.extend(
                page.issues
                    .into_iter()
                    .map(|issue| format!("{} {}", issue.key, issue.fields.summary)),
            );
            if received == 0 || tickets.len() >= page.total {
                break;
            }
        }

        Ok(tickets)
    }

    /// Log `interval_minutes` of work on `issue_key`.
    pub async fn add_worklog(
        &self,
        issue_key: &str,
        detail: &str,
        started: NaiveDateTime,
        interval_minutes: i64,
    ) -> Result<(), IntegrationError> {
        let payload = json!({
            "timeSpentSeconds": interval_minutes * 60,
            "comment": {
                "type": "doc",
                "version": 1,
                "content": [{
                    "type": "paragraph",
                    "content": [{"text": detail, "type": "text"}],
                }],
            },
            "started": started.format(WORKLOG_STARTED_FORMAT).to_string(),
        });

        let response = self
            .request(reqwest::Method::POST, &format!("issue/{issue_key}/worklog"))
            .json(&payload)
            .send()
            .await?;
        expect_status("Jira", response, reqwest::StatusCode::CREATED).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    error_messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
}

impl Producer for Jira {
    fn on_event<'a>(&'a self, _at: NaiveDateTime, config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        Box::pin(async move {
            let Some(jql) = config.jira_filter.as_deref() else {
                return Ok(Vec::new());
            };
            let tickets = self.tickets_in_sprint(jql).await?;
            debug!(tickets = tickets.len(), "Fetched Jira tickets");
            Ok(tickets.into_iter().map(Task::new).collect())
        })
    }
}

impl Consumer for Jira {
    fn post_event<'a>(&'a self, entry: &'a Entry, config: &'a Configuration) -> PluginFuture<'a, ()> {
        Box::pin(async move {
            if !config.post_to_jira {
                return Ok(());
            }
            let Some(key) = issue_key(entry.task_name()) else {
                debug!(task = entry.task_name(), "Task has no Jira issue key, skipping worklog");
                return Ok(());
            };
            debug!(issue = key, "Posting worklog to Jira");
            self.add_worklog(key, entry.detail(), entry.timestamp(), entry.interval_minutes())
                .await
                .inspect_err(|e| warn!(issue = key, error = %e, "Could not post worklog"))?;
            Ok(())
        })
    }
}
