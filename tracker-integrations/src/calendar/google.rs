use super::{Calendar, CalendarEvent, CalendarFuture};
use crate::error::IntegrationError;
use crate::http::{expect_status, http_client};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use daily_tracker_runtime::GoogleCredentials;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar events carry a colour instead of categories.
const NO_CATEGORY: &str = "-1";

/// Google Calendar over its REST API, authenticated with an OAuth access token.
pub struct GoogleCalendar {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(credentials: &GoogleCredentials, timeout: Duration) -> Result<Self, IntegrationError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: credentials.access_token.clone(),
            calendar_id: credentials.calendar_id.clone(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, at: NaiveDateTime) -> Result<Vec<CalendarEvent>, IntegrationError> {
        let url = format!("{}/calendars/{}/events", self.base_url, self.calendar_id);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", rfc3339(at)),
                ("timeMax", rfc3339(at + chrono::Duration::seconds(1))),
                ("maxResults", "10".to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;

        let events: EventList = expect_status("Google Calendar", response, reqwest::StatusCode::OK)
            .await?
            .json()
            .await?;

        Ok(events.items.into_iter().map(GoogleEvent::into_event).collect())
    }
}

impl Calendar for GoogleCalendar {
    fn appointments_at(&self, at: NaiveDateTime) -> CalendarFuture<'_> {
        Box::pin(self.fetch(at))
    }
}

/// The API needs offset-aware timestamps; popup times are local.
fn rfc3339(at: NaiveDateTime) -> String {
    match Local.from_local_datetime(&at).earliest() {
        Some(local) => local.to_rfc3339(),
        None => at.and_utc().to_rfc3339(),
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    #[serde(default)]
    summary: String,
    color_id: Option<String>,
    start: EventTime,
    end: EventTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventTime {
    fn naive(&self) -> Option<NaiveDateTime> {
        if let Some(date_time) = &self.date_time {
            return DateTime::parse_from_rfc3339(date_time)
                .ok()
                .map(|t| t.with_timezone(&Local).naive_local());
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

impl GoogleEvent {
    fn into_event(self) -> CalendarEvent {
        CalendarEvent {
            all_day: self.start.date.is_some(),
            start: self.start.naive(),
            end: self.end.naive(),
            categories: vec![self.color_id.unwrap_or_else(|| NO_CATEGORY.to_string())],
            subject: self.summary,
        }
    }
}
