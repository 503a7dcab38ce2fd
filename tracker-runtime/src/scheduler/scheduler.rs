use super::action::Action;
use super::clock::Clock;
use super::handle::SchedulerHandle;
use crate::config::{ActionFailurePolicy, ConfigSource, Configuration};
use crate::error::{panic_message, ActionError, Result, SchedulerError};
use crate::interval::next_boundary;
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Whether the scheduler has a popup armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
}

/// State shared between the loop and its handles.
#[derive(Default)]
pub(crate) struct Shared {
    running: AtomicBool,
    stop_requested: AtomicBool,
    next_firing: Mutex<Option<NaiveDateTime>>,
    wake: Notify,
}

impl Shared {
    pub(crate) fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::SeqCst) {
            SchedulerState::Armed
        } else {
            SchedulerState::Idle
        }
    }

    pub(crate) fn next_firing(&self) -> Option<NaiveDateTime> {
        *self.next_firing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_next_firing(&self, at: Option<NaiveDateTime>) {
        *self.next_firing.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub(crate) fn request_stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            debug!("Stop requested");
            self.wake.notify_one();
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

/// Resets the shared state however the loop exits.
struct RunGuard<'a>(&'a Shared);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.set_next_firing(None);
        self.0.stop_requested.store(false, Ordering::SeqCst);
        self.0.running.store(false, Ordering::SeqCst);
    }
}

/// Configured scheduler ready to start
///
/// Fires an [`Action`] on every interval boundary until stopped. Each cycle
/// re-reads the configuration, so interval changes take effect on the next
/// re-arm. The next firing is always computed from the previous scheduled
/// time, never from the wall clock, so a slow action does not shift the
/// series.
pub struct Scheduler {
    pub(crate) source: Arc<dyn ConfigSource>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) max_wait_slice: Duration,
    pub(crate) shared: Arc<Shared>,
}

impl Scheduler {
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    pub fn next_firing(&self) -> Option<NaiveDateTime> {
        self.shared.next_firing()
    }

    /// See [`SchedulerHandle::stop`].
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Run the scheduling loop from the current wall-clock time.
    pub async fn start<A>(&self, action: A) -> Result<()>
    where
        A: Action + 'static,
    {
        let now = self.clock.now();
        self.start_at(action, now).await
    }

    /// Run the scheduling loop with the first firing on the boundary after
    /// `initial`. Returns once stopped.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::AlreadyRunning`] if this scheduler is already armed.
    /// - [`SchedulerError::Config`] if the initial configuration cannot be
    ///   loaded or has an invalid interval.
    /// - [`SchedulerError::Action`] if the action fails under the `abort` policy.
    pub async fn start_at<A>(&self, action: A, initial: NaiveDateTime) -> Result<()>
    where
        A: Action + 'static,
    {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SchedulerError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.shared);

        let mut config = Arc::new(self.source.load()?);
        config.validate()?;

        let action: Arc<dyn Action> = Arc::new(action);
        let mut scheduled = next_boundary(initial, config.interval_minutes())?;

        info!(
            interval = config.interval_minutes(),
            first_popup = %scheduled,
            "Scheduler started"
        );

        loop {
            self.shared.set_next_firing(Some(scheduled));
            info!(scheduled_at = %scheduled, "Next popup armed");

            if !self.wait_until(scheduled).await {
                break;
            }
            self.shared.set_next_firing(None);

            debug!(scheduled_at = %scheduled, "Firing popup action");
            if let Err(e) = self.fire(&action, scheduled, config.clone()).await {
                match config.on_action_failure {
                    ActionFailurePolicy::Rearm => {
                        error!(scheduled_at = %scheduled, error = %e, "Popup action failed, re-arming");
                    }
                    ActionFailurePolicy::Abort => {
                        error!(scheduled_at = %scheduled, error = %e, "Popup action failed, stopping scheduler");
                        return Err(SchedulerError::Action(e));
                    }
                }
            }

            if self.shared.stop_requested() {
                break;
            }

            config = self.reload(config);
            scheduled = next_boundary(scheduled, config.interval_minutes())?;
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Sleep until `target` by the wall clock. Returns `false` when stopped
    /// first.
    async fn wait_until(&self, target: NaiveDateTime) -> bool {
        loop {
            if self.shared.stop_requested() {
                return false;
            }

            let now = self.clock.now();
            if now >= target {
                if now - target > chrono::Duration::minutes(1) {
                    warn!(scheduled_at = %target, now = %now, "Popup is late, firing to catch up");
                }
                return true;
            }

            let remaining = (target - now)
                .to_std()
                .unwrap_or(Duration::ZERO)
                .min(self.max_wait_slice);

            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = self.shared.wake.notified() => {}
            }
        }
    }

    /// Run the action on its own task so a panic is contained.
    async fn fire(
        &self,
        action: &Arc<dyn Action>,
        scheduled_at: NaiveDateTime,
        config: Arc<Configuration>,
    ) -> std::result::Result<(), ActionError> {
        let action = action.clone();
        let joined = tokio::spawn(async move { action.fire(scheduled_at, config).await }).await;

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(format!("action panicked: {}", panic_message(e.into_panic())).into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the configuration for the next cycle, keeping `previous` if the
    /// new one cannot be used.
    fn reload(&self, previous: Arc<Configuration>) -> Arc<Configuration> {
        match self.source.load().and_then(|config| config.validate().map(|()| config)) {
            Ok(config) => {
                if config.interval_minutes() != previous.interval_minutes() {
                    info!(
                        from = previous.interval_minutes(),
                        to = config.interval_minutes(),
                        "Interval changed"
                    );
                }
                Arc::new(config)
            }
            Err(e) => {
                warn!(error = %e, "Failed to reload configuration, keeping previous settings");
                previous
            }
        }
    }
}
