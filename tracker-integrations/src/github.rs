//! Offers GitHub issues and pull requests matching a search as review work.

use crate::error::IntegrationError;
use crate::http::{expect_status, http_client};
use chrono::NaiveDateTime;
use daily_tracker_runtime::{Configuration, PluginFuture, Producer, Task};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const REPOS_PREFIX: &str = "https://api.github.com/repos/";

/// Search results are reused for this long.
const CACHE_TTL: Duration = Duration::from_secs(60);

struct Cached {
    query: String,
    fetched_at: Instant,
    details: Vec<String>,
}

pub struct GitHub {
    client: reqwest::Client,
    base_url: String,
    token: String,
    cache: Mutex<Option<Cached>>,
}

impl GitHub {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            cache: Mutex::new(None),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `owner/repo#number title` for every match, sorted.
    pub async fn search_issues(&self, query: &str) -> Result<Vec<String>, IntegrationError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.query == query && cached.fetched_at.elapsed() < CACHE_TTL {
                debug!("Using cached GitHub search results");
                return Ok(cached.details.clone());
            }
        }

        let response = self
            .client
            .get(format!("{}/search/issues", self.base_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[("q", query)])
            .send()
            .await?;
        let results: SearchResults = expect_status("GitHub", response, reqwest::StatusCode::OK)
            .await?
            .json()
            .await?;

        let mut details: Vec<String> = results.items.iter().map(SearchItem::detail).collect();
        details.sort();
        details.dedup();

        *cache = Some(Cached {
            query: query.to_string(),
            fetched_at: Instant::now(),
            details: details.clone(),
        });
        Ok(details)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    repository_url: String,
    number: u64,
    title: String,
}

impl SearchItem {
    fn detail(&self) -> String {
        let repo = self
            .repository_url
            .strip_prefix(REPOS_PREFIX)
            .unwrap_or(&self.repository_url);
        format!("{}#{} {}", repo, self.number, self.title)
    }
}

impl Producer for GitHub {
    fn key(&self) -> String {
        "github".to_string()
    }

    fn on_event<'a>(&'a self, _at: NaiveDateTime, config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        Box::pin(async move {
            let Some(query) = config.github_issues_search.as_deref() else {
                return Ok(Vec::new());
            };
            let details = self.search_issues(query).await?;
            if details.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![Task::new(config.github_task_name.clone()).with_details(details)])
        })
    }
}
