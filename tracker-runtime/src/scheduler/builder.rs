use super::clock::{Clock, SystemClock};
use super::scheduler::{Scheduler, Shared};
use crate::config::{ConfigSource, Configuration, FileConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Longest single sleep before the wall clock is read again.
pub(crate) const DEFAULT_WAIT_SLICE: Duration = Duration::from_secs(60);

/// Builder for the scheduler
pub struct SchedulerBuilder {
    source: Arc<dyn ConfigSource>,
    clock: Arc<dyn Clock>,
    max_wait_slice: Duration,
}

impl SchedulerBuilder {
    /// Create a builder that re-reads configuration from `source` every cycle.
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            clock: Arc::new(SystemClock),
            max_wait_slice: DEFAULT_WAIT_SLICE,
        }
    }

    /// Create with TOML config file
    ///
    /// The file is read when the scheduler starts and again before every
    /// re-arm, so a missing file is reported by [`Scheduler::start`].
    pub fn with_toml(path: impl Into<PathBuf>) -> Self {
        Self::new(FileConfig::toml(path))
    }

    /// Create with YAML config file
    pub fn with_yaml(path: impl Into<PathBuf>) -> Self {
        Self::new(FileConfig::yaml(path))
    }

    /// Create with a fixed configuration that never changes.
    pub fn with_config(config: Configuration) -> Self {
        Self::new(config)
    }

    /// Replace the wall clock, e.g. with a simulated one in tests.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Upper bound on a single sleep. Shorter slices notice suspend/resume
    /// and clock changes sooner.
    pub fn max_wait_slice(mut self, slice: Duration) -> Self {
        self.max_wait_slice = slice.max(Duration::from_millis(1));
        self
    }

    /// Build the scheduler (does not start it yet)
    ///
    /// ```rust
    /// use daily_tracker_runtime::{Configuration, SchedulerBuilder, SchedulerState};
    ///
    /// let scheduler = SchedulerBuilder::with_config(Configuration::default()).build();
    /// assert_eq!(scheduler.state(), SchedulerState::Idle);
    /// ```
    pub fn build(self) -> Scheduler {
        info!(
            max_wait_slice_secs = self.max_wait_slice.as_secs_f64(),
            "Building scheduler"
        );

        Scheduler {
            source: self.source,
            clock: self.clock,
            max_wait_slice: self.max_wait_slice,
            shared: Arc::new(Shared::default()),
        }
    }
}
