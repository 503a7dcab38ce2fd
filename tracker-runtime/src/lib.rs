//! Daily Tracker Runtime - Scheduling and event dispatch for the tracker popup
//!
//! This crate provides the core of the daily tracker: the interval arithmetic
//! that decides when the next popup is due, the scheduler that fires it, and
//! the plugin registry and aggregator that gather candidate tasks and hand
//! completed entries to every sink.
//!
//! Integrations (database, calendars, issue trackers) live in their own crate
//! and plug in through the [`Producer`] and [`Consumer`] traits.

mod aggregator;
mod config;
mod error;
mod interval;
mod plugin;
mod scheduler;
mod task;

// Re-export public API
pub use aggregator::{ConsumerFailure, DispatchReport, EventAggregator, TaskList};
pub use config::{
    load_toml_config, load_yaml_config, ActionFailurePolicy, ConfigFormat, ConfigSource, Configuration,
    Credentials, FileConfig, GoogleCredentials, JiraCredentials, ENV_PREFIX, MAX_INTERVAL_MINUTES,
};
pub use error::{ActionError, ConfigError, PluginError, Result, SchedulerError};
pub use interval::next_boundary;
pub use plugin::{pascal_to_snake, plugin_key, Capability, Consumer, PluginFuture, PluginRegistry, Producer};
pub use scheduler::{Action, ActionFuture, Clock, Scheduler, SchedulerBuilder, SchedulerHandle, SchedulerState, SystemClock};
pub use task::{Entry, Task};
