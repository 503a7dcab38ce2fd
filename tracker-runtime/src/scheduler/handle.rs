use super::scheduler::{SchedulerState, Shared};
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Handle for a scheduler.
/// Cheap to clone; used to stop the loop from another task.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Cancel the pending wait and return the scheduler to idle.
    ///
    /// Does nothing when the scheduler is idle. If the action is running, the
    /// loop exits once it returns, without arming another firing.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.state()
    }

    /// When the armed popup is due, if one is armed.
    pub fn next_firing(&self) -> Option<NaiveDateTime> {
        self.shared.next_firing()
    }
}
