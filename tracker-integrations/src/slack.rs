//! Posts each entry to a Slack channel through an incoming webhook.

use crate::error::IntegrationError;
use crate::http::{expect_status, http_client};
use daily_tracker_runtime::{Configuration, Consumer, Entry, PluginFuture};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const USERNAME: &str = "Daily Tracker";
const ICON: &str = ":clock10:";

pub struct SlackWebhook {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhook {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            webhook_url: webhook_url.into(),
        })
    }

    /// Post a Markdown message to the channel.
    pub async fn post_message(&self, text: &str) -> Result<(), IntegrationError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({
                "text": text,
                "username": USERNAME,
                "icon_emoji": ICON,
            }))
            .send()
            .await?;
        expect_status("Slack", response, reqwest::StatusCode::OK).await?;
        Ok(())
    }
}

/// Message posted for an entry, e.g. `*Coding*: parser`.
pub fn entry_message(entry: &Entry) -> String {
    format!("*{}*: {}", entry.task_name(), entry.detail())
}

impl Consumer for SlackWebhook {
    fn key(&self) -> String {
        "slack".to_string()
    }

    fn post_event<'a>(&'a self, entry: &'a Entry, config: &'a Configuration) -> PluginFuture<'a, ()> {
        Box::pin(async move {
            if !config.post_to_slack {
                return Ok(());
            }
            debug!(task = entry.task_name(), "Posting entry to Slack");
            self.post_message(&entry_message(entry)).await?;
            Ok(())
        })
    }
}
