//! End-to-end popup cycle: suggestions in, entry out.

use chrono::NaiveDateTime;
use daily_tracker::{
    Action, Configuration, Consumer, Database, Entry, EventAggregator, Form, FormError, PluginError, PluginFuture,
    PluginRegistry, PopupAction, PopupOutcome, PopupRequest, Producer, SchedulerBuilder, Task,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn iso(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
}

/// Replays canned answers and remembers what it was shown.
#[derive(Default)]
struct ScriptedForm {
    answers: Mutex<VecDeque<PopupOutcome>>,
    requests: Mutex<Vec<PopupRequest>>,
    errors: Mutex<Vec<String>>,
}

impl ScriptedForm {
    fn answering(answers: impl IntoIterator<Item = PopupOutcome>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        })
    }
}

impl Form for ScriptedForm {
    fn show(&self, request: PopupRequest) -> Result<PopupOutcome, FormError> {
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| FormError::Unavailable("script exhausted".to_string()))
    }

    fn report_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

fn submitted(task: &str, detail: &str) -> PopupOutcome {
    PopupOutcome::Submitted {
        task: task.to_string(),
        detail: detail.to_string(),
    }
}

struct Meeting;

impl Producer for Meeting {
    fn on_event<'a>(&'a self, _at: NaiveDateTime, _config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        Box::pin(async { Ok(vec![Task::new("Meetings").with_detail("Standup").with_priority(0)]) })
    }
}

struct Unreachable;

impl Producer for Unreachable {
    fn on_event<'a>(&'a self, _at: NaiveDateTime, _config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        Box::pin(async { Err(PluginError::failed("connection refused")) })
    }
}

/// Stands in for a broken database.
struct ReadOnlyStore;

impl Consumer for ReadOnlyStore {
    fn is_persistent(&self) -> bool {
        true
    }

    fn post_event<'a>(&'a self, _entry: &'a Entry, _config: &'a Configuration) -> PluginFuture<'a, ()> {
        Box::pin(async { Err(PluginError::failed("attempt to write a readonly database")) })
    }
}

fn action(registry: PluginRegistry, form: Arc<ScriptedForm>) -> PopupAction {
    PopupAction::new(EventAggregator::new(Arc::new(registry)), form)
}

#[tokio::test]
async fn test_answer_is_recorded_and_suggested_next_time() {
    let database = Database::open_in_memory().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register_plugin(Arc::new(database.clone()));

    let form = ScriptedForm::answering([submitted(" Coding ", "parser"), PopupOutcome::Cancelled]);
    let popup = action(registry, form.clone());
    let config = Arc::new(Configuration {
        default_tasks: vec!["Admin".to_string()],
        ..Configuration::default()
    });

    popup.fire(iso("2020-01-01 09:15:00"), config.clone()).await.unwrap();
    popup.fire(iso("2020-01-01 09:30:00"), config).await.unwrap();

    assert_eq!(
        database.last_task_and_detail(iso("2020-01-01 09:30:00")).unwrap(),
        Some(("Coding".to_string(), "parser".to_string()))
    );

    let requests = form.requests.lock().unwrap();
    assert_eq!(requests[0].default_task.as_deref(), Some("Admin"));
    assert_eq!(requests[1].default_task.as_deref(), Some("Coding"));
    assert_eq!(requests[1].default_detail, "parser");
    assert_eq!(requests[1].interval_minutes, 15);
}

#[tokio::test]
async fn test_calendar_meeting_wins_prefill_when_registered_first() {
    let database = Database::open_in_memory().unwrap();
    database
        .record(&Entry::new(iso("2020-01-01 09:00:00"), "Coding", "parser", 15))
        .unwrap();

    let mut registry = PluginRegistry::new();
    registry.register_producer(Meeting).register_plugin(Arc::new(database));

    let form = ScriptedForm::answering([PopupOutcome::Cancelled]);
    action(registry, form.clone())
        .fire(iso("2020-01-01 09:15:00"), Arc::new(Configuration::default()))
        .await
        .unwrap();

    let requests = form.requests.lock().unwrap();
    assert_eq!(requests[0].default_task.as_deref(), Some("Meetings"));
    assert_eq!(requests[0].default_detail, "Standup");
}

#[tokio::test]
async fn test_all_sources_down_still_shows_form() {
    let mut registry = PluginRegistry::new();
    registry.register_producer(Unreachable);

    let form = ScriptedForm::answering([PopupOutcome::Cancelled]);
    action(registry, form.clone())
        .fire(iso("2020-01-01 09:15:00"), Arc::new(Configuration::default()))
        .await
        .unwrap();

    let requests = form.requests.lock().unwrap();
    assert!(requests[0].options.is_empty());
    assert!(requests[0].notice.is_some());
}

#[tokio::test]
async fn test_persistence_failure_is_reported_to_user() {
    let mut registry = PluginRegistry::new();
    registry.register_consumer(ReadOnlyStore);

    let form = ScriptedForm::answering([submitted("Coding", "parser")]);
    action(registry, form.clone())
        .fire(iso("2020-01-01 09:15:00"), Arc::new(Configuration::default()))
        .await
        .unwrap();

    let errors = form.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("readonly database"));
}

#[tokio::test]
async fn test_form_failure_fails_the_action() {
    let form = ScriptedForm::answering([]);
    let result = action(PluginRegistry::new(), form)
        .fire(iso("2020-01-01 09:15:00"), Arc::new(Configuration::default()))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_scheduler_drives_popup() {
    let database = Database::open_in_memory().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register_plugin(Arc::new(database.clone()));

    // The script runs out on the third popup; the default policy re-arms
    let form = ScriptedForm::answering([submitted("Coding", "parser"), submitted("Email", "")]);
    let scheduler = Arc::new(SchedulerBuilder::with_config(Configuration::default()).build());

    let runner = {
        let scheduler = scheduler.clone();
        let popup = action(registry, form.clone());
        tokio::spawn(async move { scheduler.start_at(popup, iso("2020-01-01 09:00:00")).await })
    };

    // The scheduler's wall clock is real here, so every boundary is already
    // in the past and the popups fire back to back.
    while form.requests.lock().unwrap().len() < 3 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    scheduler.stop();
    runner.await.unwrap().unwrap();

    assert_eq!(
        database.last_task_and_detail(iso("2020-01-01 09:30:00")).unwrap(),
        Some(("Email".to_string(), String::new()))
    );
    let requests = form.requests.lock().unwrap();
    assert_eq!(requests[0].scheduled_at, iso("2020-01-01 09:15:00"));
    assert_eq!(requests[1].scheduled_at, iso("2020-01-01 09:30:00"));
}
