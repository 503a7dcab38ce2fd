use chrono::NaiveDateTime;
use thiserror::Error;

/// Everything the form needs to ask one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupRequest {
    /// The boundary this popup is for.
    pub scheduled_at: NaiveDateTime,
    pub interval_minutes: i64,
    pub default_task: Option<String>,
    pub default_detail: String,
    /// Dropdown entries as `(task, details)`, most relevant first.
    pub options: Vec<(String, Vec<String>)>,
    /// Shown above the form, e.g. when no task source could be reached.
    pub notice: Option<String>,
}

/// What the user did with the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupOutcome {
    Submitted { task: String, detail: String },
    Cancelled,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Form I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Form is unavailable: {0}")]
    Unavailable(String),
}

/// The user-facing popup.
///
/// `show` blocks until the user answers, so it is always called from a
/// blocking thread.
pub trait Form: Send + Sync {
    fn show(&self, request: PopupRequest) -> Result<PopupOutcome, FormError>;

    /// Tell the user about a failure they need to act on.
    fn report_error(&self, message: &str);
}
