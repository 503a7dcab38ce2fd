//! Error types for the integrations.

use daily_tracker_runtime::{ConfigError, PluginError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with an unexpected status.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<IntegrationError> for PluginError {
    fn from(error: IntegrationError) -> Self {
        PluginError::failed(error)
    }
}
