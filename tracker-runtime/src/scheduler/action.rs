use crate::config::Configuration;
use crate::error::ActionError;
use chrono::NaiveDateTime;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by [`Action::fire`].
pub type ActionFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ActionError>> + Send + 'a>>;

/// Work performed at every scheduled firing.
///
/// `scheduled_at` is the boundary that was due, not the wall-clock time the
/// action actually started. `config` is the snapshot for this cycle.
///
/// Closures returning a future implement this trait:
///
/// ```rust
/// use daily_tracker_runtime::{Action, ActionError, Configuration};
/// use chrono::NaiveDateTime;
/// use std::sync::Arc;
///
/// let action = |at: NaiveDateTime, _config: Arc<Configuration>| async move {
///     println!("popup due at {at}");
///     Ok::<(), ActionError>(())
/// };
/// # fn assert_action<A: Action>(_: &A) {}
/// # assert_action(&action);
/// ```
pub trait Action: Send + Sync {
    fn fire(&self, scheduled_at: NaiveDateTime, config: Arc<Configuration>) -> ActionFuture<'_>;
}

impl<F, Fut> Action for F
where
    F: Fn(NaiveDateTime, Arc<Configuration>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
{
    fn fire(&self, scheduled_at: NaiveDateTime, config: Arc<Configuration>) -> ActionFuture<'_> {
        Box::pin(self(scheduled_at, config))
    }
}
