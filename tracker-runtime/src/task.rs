use chrono::NaiveDateTime;

/// A candidate task offered in the popup.
///
/// Producers build these fresh on every pass; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    /// Sub-task descriptions, most relevant first.
    pub details: Vec<String>,
    /// Lower sorts first. `0` marks the task that should pre-fill the popup.
    pub priority: i32,
    /// Always offered, regardless of recency.
    pub is_default: bool,
}

impl Task {
    /// Priority of the task that should pre-fill the popup.
    pub const PREFILL_PRIORITY: i32 = 0;
    pub const DEFAULT_PRIORITY: i32 = 1;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
            is_default: false,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn with_details<I, S>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.details.extend(details.into_iter().map(Into::into));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark as a default task.
    pub fn always_offered(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// One completed, timestamped work record.
///
/// The timestamp is the scheduled popup time, not the moment the form was
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    timestamp: NaiveDateTime,
    task_name: String,
    detail: String,
    interval_minutes: i64,
}

impl Entry {
    pub fn new(
        timestamp: NaiveDateTime,
        task_name: impl Into<String>,
        detail: impl Into<String>,
        interval_minutes: i64,
    ) -> Self {
        Self {
            timestamp,
            task_name: task_name.into(),
            detail: detail.into(),
            interval_minutes,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn interval_minutes(&self) -> i64 {
        self.interval_minutes
    }
}
