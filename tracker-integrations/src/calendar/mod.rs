//! Calendars that contribute the current meeting to the popup.

mod google;

pub use google::GoogleCalendar;

use crate::error::IntegrationError;
use chrono::NaiveDateTime;
use daily_tracker_runtime::{ConfigError, Configuration, PluginFuture, Producer, Task};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// Task name used for calendar appointments.
pub const MEETINGS_TASK: &str = "Meetings";

/// Values accepted by the `linked_calendar` option.
pub const SUPPORTED_CALENDARS: &[&str] = &["none", "google"];

/// An appointment as reported by a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub subject: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub categories: Vec<String>,
    pub all_day: bool,
}

pub type CalendarFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<CalendarEvent>, IntegrationError>> + Send + 'a>>;

/// A calendar provider.
pub trait Calendar: Send + Sync {
    /// Events scheduled on or over `at`.
    fn appointments_at(&self, at: NaiveDateTime) -> CalendarFuture<'_>;
}

/// Drop all-day events and events in any excluded category.
pub fn filter_appointments(events: Vec<CalendarEvent>, excluded_categories: &[String]) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .filter(|event| !event.all_day)
        .filter(|event| !event.categories.iter().any(|c| excluded_categories.contains(c)))
        .collect()
}

/// Placeholder used when no calendar is linked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCalendar;

impl Calendar for NoCalendar {
    fn appointments_at(&self, _at: NaiveDateTime) -> CalendarFuture<'_> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// The calendar selected by `linked_calendar`, registered as a producer.
pub struct LinkedCalendar {
    calendar: Box<dyn Calendar>,
}

impl LinkedCalendar {
    pub fn new(calendar: impl Calendar + 'static) -> Self {
        Self {
            calendar: Box::new(calendar),
        }
    }

    /// Resolve the `linked_calendar` selector.
    pub fn from_config(config: &Configuration) -> Result<Self, IntegrationError> {
        match config.linked_calendar.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::new(NoCalendar)),
            "google" => {
                let credentials = config
                    .credentials
                    .google
                    .as_ref()
                    .ok_or(ConfigError::MissingCredentials("google calendar"))?;
                Ok(Self::new(GoogleCalendar::new(credentials, config.plugin_timeout())?))
            }
            _ => Err(ConfigError::UnknownCalendar {
                name: config.linked_calendar.clone(),
                supported: SUPPORTED_CALENDARS.join(", "),
            }
            .into()),
        }
    }

    /// Meeting task for the filtered `events`, if any.
    fn meetings_task(events: Vec<CalendarEvent>, config: &Configuration) -> Option<Task> {
        if events.is_empty() {
            return None;
        }
        let priority = if events.len() == 1 && config.use_calendar_appointments {
            Task::PREFILL_PRIORITY
        } else {
            Task::DEFAULT_PRIORITY
        };
        Some(
            Task::new(MEETINGS_TASK)
                .with_details(events.into_iter().map(|e| e.subject))
                .with_priority(priority),
        )
    }
}

impl Producer for LinkedCalendar {
    fn key(&self) -> String {
        "calendar".to_string()
    }

    fn on_event<'a>(&'a self, at: NaiveDateTime, config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        Box::pin(async move {
            let events = self.calendar.appointments_at(at).await?;
            let events = filter_appointments(events, &config.appointment_category_exclusions);
            debug!(at = %at, meetings = events.len(), "Calendar events found");
            Ok(Self::meetings_task(events, config).into_iter().collect())
        })
    }
}
