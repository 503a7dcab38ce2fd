use crate::form::{Form, FormError, PopupOutcome, PopupRequest};
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

/// Input that dismisses the popup.
const CANCEL: &str = ":q";

/// A terminal popup.
///
/// Prints the suggestions as a numbered list and reads the answer line by
/// line. An empty line accepts the default, a number picks from the list,
/// anything else is taken literally. `:q` or end of input cancels.
pub struct ConsoleForm<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl ConsoleForm<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> ConsoleForm<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Consume the form and return its output, e.g. to inspect it in tests.
    pub fn into_output(self) -> W {
        self.output.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_answer(input: &mut R) -> Result<Option<String>, FormError> {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let answer = line.trim();
        if answer == CANCEL {
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }
}

/// Resolve an answer against a numbered list.
fn pick(answer: &str, choices: &[String]) -> Option<String> {
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| choices.get(i))
        .cloned()
}

impl<R, W> Form for ConsoleForm<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn show(&self, request: PopupRequest) -> Result<PopupOutcome, FormError> {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);

        writeln!(
            out,
            "\n[{}] What are you working on? (last {} minutes)",
            request.scheduled_at.format("%H:%M"),
            request.interval_minutes
        )?;
        if let Some(notice) = &request.notice {
            writeln!(out, "  ! {notice}")?;
        }

        let names: Vec<String> = request.options.iter().map(|(name, _)| name.clone()).collect();
        for (i, name) in names.iter().enumerate() {
            writeln!(out, "  {:>2}) {}", i + 1, name)?;
        }

        match &request.default_task {
            Some(default) => write!(out, "Task [{default}]: ")?,
            None => write!(out, "Task: ")?,
        }
        out.flush()?;

        let Some(answer) = Self::read_answer(&mut input)? else {
            return Ok(PopupOutcome::Cancelled);
        };
        let task = if answer.is_empty() {
            match &request.default_task {
                Some(default) => default.clone(),
                None => return Ok(PopupOutcome::Cancelled),
            }
        } else {
            pick(&answer, &names).unwrap_or(answer)
        };

        let details = request
            .options
            .iter()
            .find(|(name, _)| *name == task)
            .map(|(_, details)| details.clone())
            .unwrap_or_default();
        let default_detail = if request.default_task.as_deref() == Some(task.as_str()) {
            request.default_detail.clone()
        } else {
            details.first().cloned().unwrap_or_default()
        };

        for (i, detail) in details.iter().enumerate() {
            writeln!(out, "  {:>2}) {}", i + 1, detail)?;
        }
        if default_detail.is_empty() {
            write!(out, "Detail: ")?;
        } else {
            write!(out, "Detail [{default_detail}]: ")?;
        }
        out.flush()?;

        let Some(answer) = Self::read_answer(&mut input)? else {
            return Ok(PopupOutcome::Cancelled);
        };
        let detail = if answer.is_empty() {
            default_detail
        } else {
            pick(&answer, &details).unwrap_or(answer)
        };

        Ok(PopupOutcome::Submitted { task, detail })
    }

    fn report_error(&self, message: &str) {
        let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "error: {message}").and_then(|()| out.flush()) {
            warn!(error = %e, "Could not show error to the user");
        }
    }
}
