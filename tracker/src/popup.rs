use crate::form::{Form, PopupOutcome, PopupRequest};
use chrono::NaiveDateTime;
use daily_tracker_runtime::{Action, ActionError, ActionFuture, Configuration, Entry, EventAggregator, TaskList};
use std::sync::Arc;
use tracing::{info, warn};

const SOURCES_DOWN_NOTICE: &str = "No task source could be reached, suggestions may be missing";

/// The action fired on every boundary: gather suggestions, ask the user,
/// hand the answer to every consumer.
pub struct PopupAction {
    aggregator: EventAggregator,
    form: Arc<dyn Form>,
}

impl PopupAction {
    pub fn new(aggregator: EventAggregator, form: Arc<dyn Form>) -> Self {
        Self { aggregator, form }
    }

    async fn run(&self, scheduled_at: NaiveDateTime, config: Arc<Configuration>) -> Result<(), ActionError> {
        let tasks = self.aggregator.collect_tasks(scheduled_at, config.clone()).await;
        let request = popup_request(&tasks, scheduled_at, config.interval_minutes());

        let form = self.form.clone();
        let outcome = tokio::task::spawn_blocking(move || form.show(request)).await??;

        let (task, detail) = match outcome {
            PopupOutcome::Submitted { task, detail } => (task.trim().to_string(), detail.trim().to_string()),
            PopupOutcome::Cancelled => {
                info!(scheduled_at = %scheduled_at, "Popup dismissed");
                return Ok(());
            }
        };
        if task.is_empty() {
            warn!(scheduled_at = %scheduled_at, "Submitted without a task, nothing recorded");
            return Ok(());
        }

        info!(scheduled_at = %scheduled_at, task = %task, "Recording entry");
        let entry = Entry::new(scheduled_at, task, detail, config.interval_minutes());
        let report = self.aggregator.dispatch_entry(entry, config).await;

        if let Some(failure) = report.persistence_failure() {
            let message = format!("Your entry could not be saved: {}", failure.error);
            let form = self.form.clone();
            tokio::task::spawn_blocking(move || form.report_error(&message)).await?;
        }

        Ok(())
    }
}

impl Action for PopupAction {
    fn fire(&self, scheduled_at: NaiveDateTime, config: Arc<Configuration>) -> ActionFuture<'_> {
        Box::pin(self.run(scheduled_at, config))
    }
}

/// Build the form request from the merged suggestions.
pub fn popup_request(tasks: &TaskList, scheduled_at: NaiveDateTime, interval_minutes: i64) -> PopupRequest {
    let (default_task, default_detail) = match tasks.default_selection() {
        Some((task, detail)) => (Some(task.to_string()), detail.to_string()),
        None => (None, String::new()),
    };

    PopupRequest {
        scheduled_at,
        interval_minutes,
        default_task,
        default_detail,
        options: tasks.dropdown_options(),
        notice: tasks.all_sources_failed().then(|| SOURCES_DOWN_NOTICE.to_string()),
    }
}
