//! # Daily Tracker - What are you working on?
//!
//! Every few minutes a small popup asks what you are doing, suggests the most
//! likely answers, and keeps what you type.
//!
//! ## Features
//!
//! - **Boundary scheduling**: popups land on fixed minutes past the hour
//!   (`:00`, `:15`, `:30`, `:45` for a 15 minute interval) and never drift
//! - **Live configuration**: the config file is re-read before every popup
//! - **Suggestions**: the last answer, recent tasks, the current meeting,
//!   Jira tickets and GitHub reviews are merged into one ranked list
//! - **Sinks**: answers are saved to SQLite first, then optionally posted to
//!   Jira worklogs and a Slack channel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daily_tracker::{
//!     build_registry, ConsoleForm, Database, EventAggregator, FileConfig, PopupAction,
//!     SchedulerBuilder, ConfigSource,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = FileConfig::new("config/tracker.toml");
//!     let config = source.load()?;
//!     config.validate()?;
//!
//!     let database = Database::open(&config.database_path)?;
//!     let registry = build_registry(&config, database)?;
//!     let action = PopupAction::new(
//!         EventAggregator::new(Arc::new(registry)),
//!         Arc::new(ConsoleForm::stdio()),
//!     );
//!
//!     let scheduler = SchedulerBuilder::new(source).build();
//!     let handle = scheduler.handle();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         handle.stop();
//!     });
//!
//!     scheduler.start(action).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/tracker.toml`:
//!
//! ```toml
//! interval = 15
//! show_last_n_weeks = 2
//! linked_calendar = "none"
//! default_tasks = ["Admin", "Email"]
//! ```
//!
//! Or `config/tracker.yaml`:
//!
//! ```yaml
//! interval: 15
//! default_tasks:
//!   - Admin
//!   - Email
//! ```
//!
//! Secrets are best kept in environment variables with the `TRACKER_` prefix,
//! using `__` between nested keys:
//!
//! ```bash
//! export TRACKER_CREDENTIALS__SLACK_WEBHOOK_URL="https://hooks.slack.com/services/..."
//! export TRACKER_CREDENTIALS__JIRA__SECRET="..."
//! ```

mod console;
mod form;
mod popup;

pub use console::ConsoleForm;
pub use form::{Form, FormError, PopupOutcome, PopupRequest};
pub use popup::{popup_request, PopupAction};

// Re-export core types
pub use daily_tracker_runtime::{
    load_toml_config, load_yaml_config, next_boundary, Action, ActionError, ActionFailurePolicy, Capability,
    Clock, ConfigError, ConfigSource, Configuration, Consumer, DispatchReport, Entry, EventAggregator,
    FileConfig, PluginError, PluginFuture, PluginRegistry, Producer, Scheduler, SchedulerBuilder,
    SchedulerError, SchedulerHandle, SchedulerState, SystemClock, Task, TaskList,
};

// Re-export integrations
pub use daily_tracker_integrations::{build_registry, Database, IntegrationError, LinkedCalendar};

// Make the underlying crates available for less common types
pub use daily_tracker_integrations;
pub use daily_tracker_runtime;
