//! SQLite-backed entry history.
//!
//! The `tracker` table is append-only: one row per answered popup. It is both
//! the persistence sink and the main source of dropdown suggestions.

use crate::error::IntegrationError;
use chrono::NaiveDateTime;
use daily_tracker_runtime::{Configuration, Consumer, Entry, PluginError, PluginFuture, Producer, Task};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Timestamps are stored as text in this format so they sort chronologically.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Most recent distinct details returned per task.
const DETAILS_PER_TASK: usize = 10;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracker (
    date_time TEXT NOT NULL,
    task      TEXT NOT NULL,
    detail    TEXT NOT NULL DEFAULT '',
    interval  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tracker_date_time ON tracker (date_time);
CREATE INDEX IF NOT EXISTS idx_tracker_task ON tracker (task);
";

/// Local history of entries.
///
/// Cheap to clone; clones share one connection behind a mutex.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IntegrationError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening tracker database");
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IntegrationError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, IntegrationError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry.
    pub fn record(&self, entry: &Entry) -> Result<(), IntegrationError> {
        self.lock().execute(
            "INSERT INTO tracker (date_time, task, detail, interval) VALUES (?1, ?2, ?3, ?4)",
            params![
                format_timestamp(entry.timestamp()),
                entry.task_name(),
                entry.detail(),
                entry.interval_minutes(),
            ],
        )?;
        Ok(())
    }

    /// The latest task and detail recorded at or before `at`.
    pub fn last_task_and_detail(&self, at: NaiveDateTime) -> Result<Option<(String, String)>, IntegrationError> {
        let row = self
            .lock()
            .query_row(
                "SELECT task, detail FROM tracker
                 WHERE date_time <= ?1
                 ORDER BY date_time DESC
                 LIMIT 1",
                params![format_timestamp(at)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Tasks recorded within `window` before `at`, alphabetically, each with
    /// its latest detail.
    pub fn recent_tasks(
        &self,
        at: NaiveDateTime,
        window: chrono::Duration,
    ) -> Result<Vec<(String, String)>, IntegrationError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT task, detail, MAX(date_time) FROM tracker
             WHERE date_time >= ?1 AND date_time <= ?2
             GROUP BY task
             ORDER BY task",
        )?;
        let rows = stmt.query_map(
            params![format_timestamp(at - window), format_timestamp(at)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Up to ten distinct details used with `task`, most recent first.
    pub fn details_for(&self, task: &str) -> Result<Vec<String>, IntegrationError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT detail FROM tracker
             WHERE task = ?1 AND detail <> ''
             GROUP BY detail
             ORDER BY MAX(date_time) DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![task, DETAILS_PER_TASK as i64], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Suggestions for the popup at `at`.
    ///
    /// The last answer comes first with prefill priority, then recent tasks,
    /// then the configured defaults.
    pub fn tasks_at(
        &self,
        at: NaiveDateTime,
        window: chrono::Duration,
        default_tasks: &[String],
    ) -> Result<Vec<Task>, IntegrationError> {
        let mut tasks = Vec::new();

        if let Some((task, detail)) = self.last_task_and_detail(at)? {
            let mut last = Task::new(task).with_priority(Task::PREFILL_PRIORITY);
            if !detail.is_empty() {
                last = last.with_detail(detail);
            }
            tasks.push(last);
        }

        for (task, _) in self.recent_tasks(at, window)? {
            let details = self.details_for(&task)?;
            tasks.push(Task::new(task).with_details(details));
        }

        for task in default_tasks {
            let details = self.details_for(task)?;
            tasks.push(Task::new(task.clone()).with_details(details).always_offered());
        }

        Ok(tasks)
    }
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(DATE_TIME_FORMAT).to_string()
}

impl Producer for Database {
    fn on_event<'a>(&'a self, at: NaiveDateTime, config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
        let db = self.clone();
        let window = config.recent_window();
        let defaults = config.default_tasks.clone();
        Box::pin(async move {
            let tasks = tokio::task::spawn_blocking(move || db.tasks_at(at, window, &defaults))
                .await
                .map_err(PluginError::failed)??;
            Ok(tasks)
        })
    }
}

impl Consumer for Database {
    fn is_persistent(&self) -> bool {
        true
    }

    fn post_event<'a>(&'a self, entry: &'a Entry, _config: &'a Configuration) -> PluginFuture<'a, ()> {
        let db = self.clone();
        let entry = entry.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || db.record(&entry))
                .await
                .map_err(PluginError::failed)??;
            Ok(())
        })
    }
}
