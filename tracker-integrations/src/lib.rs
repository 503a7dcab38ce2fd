//! Daily Tracker Integrations - Task sources and entry sinks
//!
//! Every integration implements [`Producer`], [`Consumer`] or both from the
//! runtime crate. [`build_registry`] wires up the ones the configuration
//! enables, in the order their suggestions should appear.
//!
//! [`Producer`]: daily_tracker_runtime::Producer
//! [`Consumer`]: daily_tracker_runtime::Consumer

pub mod calendar;
mod database;
mod error;
mod github;
mod http;
mod jira;
mod slack;

pub use calendar::{Calendar, CalendarEvent, GoogleCalendar, LinkedCalendar, NoCalendar};
pub use database::{Database, DATE_TIME_FORMAT};
pub use error::IntegrationError;
pub use github::GitHub;
pub use jira::{issue_key, Jira};
pub use slack::{entry_message, SlackWebhook};

use daily_tracker_runtime::{Configuration, PluginRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the plugin registry for `config`.
///
/// The calendar comes first so a single current meeting wins the prefill,
/// then the database history, then the remote trackers. Integrations whose
/// credentials are missing are skipped with a warning when their feature is
/// turned on.
///
/// # Errors
///
/// Fails when the linked calendar is unknown or lacks credentials, or when an
/// HTTP client cannot be created.
pub fn build_registry(config: &Configuration, database: Database) -> Result<PluginRegistry, IntegrationError> {
    let timeout = config.plugin_timeout();
    let credentials = &config.credentials;
    let mut registry = PluginRegistry::new();

    registry.register_producer(LinkedCalendar::from_config(config)?);
    registry.register_plugin(Arc::new(database));

    match &credentials.jira {
        Some(jira) => {
            registry.register_plugin(Arc::new(Jira::new(jira, timeout)?));
        }
        None if config.jira_filter.is_some() || config.post_to_jira => {
            warn!("Jira is enabled but no Jira credentials are configured, skipping");
        }
        None => {}
    }

    match &credentials.github_token {
        Some(token) => {
            registry.register_producer(GitHub::new(token.clone(), timeout)?);
        }
        None if config.github_issues_search.is_some() => {
            warn!("GitHub search is configured but no GitHub token is set, skipping");
        }
        None => {}
    }

    match &credentials.slack_webhook_url {
        Some(url) => {
            registry.register_consumer(SlackWebhook::new(url.clone(), timeout)?);
        }
        None if config.post_to_slack => {
            warn!("Posting to Slack is enabled but no webhook URL is configured, skipping");
        }
        None => {}
    }

    info!(
        producers = ?registry.producer_keys(),
        consumers = ?registry.consumer_keys(),
        "Plugin registry built"
    );
    Ok(registry)
}
