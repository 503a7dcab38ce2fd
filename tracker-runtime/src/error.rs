//! Error types for the tracker runtime.

use chrono::NaiveDateTime;
use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Error returned by a scheduled action.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Interval must be between one minute and one day.
    #[error("Invalid interval: {0} minutes (must be between 1 and 1440)")]
    InvalidInterval(i64),

    /// The next boundary falls outside the representable date range.
    #[error("No popup time after {from} fits an interval of {interval} minutes")]
    BoundaryOutOfRange { from: NaiveDateTime, interval: i64 },

    /// The linked calendar selector does not name a known calendar.
    #[error("Unknown linked calendar '{name}', supported calendars: {supported}")]
    UnknownCalendar { name: String, supported: String },

    /// An integration was selected without the credentials it needs.
    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),
}

/// Errors that stop the scheduling loop.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Only returned when the failure policy is `abort`.
    #[error("Scheduled action failed: {0}")]
    Action(ActionError),
}

/// Failure of a single producer or consumer call.
///
/// These never escape the aggregator; they are logged and recorded in the
/// pass result instead.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl PluginError {
    /// Wrap any error as a plugin failure.
    pub fn failed<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Failed(error.into())
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
