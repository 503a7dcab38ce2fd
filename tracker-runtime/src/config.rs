use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Prefix for environment overrides, e.g. `TRACKER_INTERVAL=10` or
/// `TRACKER_CREDENTIALS__SLACK_WEBHOOK_URL=...`.
pub const ENV_PREFIX: &str = "TRACKER";

/// Longest accepted interval: one popup a day.
pub const MAX_INTERVAL_MINUTES: i64 = 24 * 60;

/// What the scheduler does when the popup action fails or panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionFailurePolicy {
    /// Log the failure and arm the next popup.
    #[default]
    Rearm,
    /// Stop the scheduler and return the error.
    Abort,
}

/// Snapshot of the user options.
///
/// Re-read at the start of every scheduling cycle so edits to the file take
/// effect without a restart. Nothing mutates a snapshot once it is loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Minutes between popups, at most a day. Values that divide 60 align best.
    pub interval: i64,
    pub show_last_n_weeks: u32,
    /// Calendar used for meetings (`none` or `google`).
    pub linked_calendar: String,
    /// Pre-fill the popup with the current meeting when there is exactly one.
    pub use_calendar_appointments: bool,
    pub appointment_category_exclusions: Vec<String>,
    /// Tasks always offered in the dropdown.
    pub default_tasks: Vec<String>,
    pub jira_filter: Option<String>,
    pub github_issues_search: Option<String>,
    pub github_task_name: String,
    pub post_to_jira: bool,
    pub post_to_slack: bool,
    pub on_action_failure: ActionFailurePolicy,
    /// Upper bound for a single producer or consumer call.
    pub plugin_timeout_secs: u64,
    pub database_path: PathBuf,
    pub credentials: Credentials,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            interval: 15,
            show_last_n_weeks: 2,
            linked_calendar: "none".to_string(),
            use_calendar_appointments: true,
            appointment_category_exclusions: Vec::new(),
            default_tasks: Vec::new(),
            jira_filter: None,
            github_issues_search: None,
            github_task_name: "Peer Review".to_string(),
            post_to_jira: false,
            post_to_slack: false,
            on_action_failure: ActionFailurePolicy::default(),
            plugin_timeout_secs: 30,
            database_path: PathBuf::from("tracker.db"),
            credentials: Credentials::default(),
        }
    }
}

impl Configuration {
    /// Check the options the scheduler cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.interval) {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        if 60 % self.interval != 0 {
            warn!(
                interval = self.interval,
                "Interval does not divide 60, popups will not align to the same minutes every hour"
            );
        }
        Ok(())
    }

    pub fn interval_minutes(&self) -> i64 {
        self.interval
    }

    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout_secs)
    }

    /// How far back the dropdown looks for recent tasks.
    pub fn recent_window(&self) -> chrono::Duration {
        chrono::Duration::weeks(i64::from(self.show_last_n_weeks))
    }
}

/// Secrets for the integrations. Usually supplied through the environment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub jira: Option<JiraCredentials>,
    pub slack_webhook_url: Option<String>,
    pub github_token: Option<String>,
    pub google: Option<GoogleCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraCredentials {
    /// Atlassian site name, the `<domain>` in `<domain>.atlassian.net`.
    pub domain: String,
    /// Account email address.
    pub key: String,
    /// API token.
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCredentials {
    pub access_token: String,
    #[serde(default = "primary_calendar")]
    pub calendar_id: String,
}

fn primary_calendar() -> String {
    "primary".to_string()
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Guess the format from a file extension, defaulting to TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Toml,
        }
    }

    fn file_format(self) -> FileFormat {
        match self {
            Self::Toml => FileFormat::Toml,
            Self::Yaml => FileFormat::Yaml,
        }
    }
}

/// Load configuration from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Configuration, ConfigError> {
    load_config_with_format(path.as_ref(), ConfigFormat::Toml)
}

/// Load configuration from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Configuration, ConfigError> {
    load_config_with_format(path.as_ref(), ConfigFormat::Yaml)
}

fn load_config_with_format(path: &Path, format: ConfigFormat) -> Result<Configuration, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).format(format.file_format()))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("appointment_category_exclusions")
                .with_list_parse_key("default_tasks"),
        )
        .build()?;
    Ok(config.try_deserialize()?)
}

/// Where the scheduler re-reads its configuration from on every cycle.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Configuration, ConfigError>;
}

/// Configuration file on disk, layered with `TRACKER_` environment variables.
#[derive(Debug, Clone)]
pub struct FileConfig {
    path: PathBuf,
    format: ConfigFormat,
}

impl FileConfig {
    /// Format is inferred from the extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = ConfigFormat::from_path(&path);
        Self { path, format }
    }

    pub fn toml(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: ConfigFormat::Toml,
        }
    }

    pub fn yaml(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: ConfigFormat::Yaml,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfig {
    fn load(&self) -> Result<Configuration, ConfigError> {
        load_config_with_format(&self.path, self.format)
    }
}

/// A fixed snapshot, for embedding and tests.
impl ConfigSource for Configuration {
    fn load(&self) -> Result<Configuration, ConfigError> {
        Ok(self.clone())
    }
}
