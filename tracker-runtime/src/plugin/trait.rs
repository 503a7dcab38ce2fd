use super::key::plugin_key;
use crate::config::Configuration;
use crate::error::PluginError;
use crate::task::{Entry, Task};
use chrono::NaiveDateTime;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by plugin calls.
pub type PluginFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PluginError>> + Send + 'a>>;

/// A source of candidate tasks for the popup.
///
/// # Example
///
/// ```rust
/// use daily_tracker_runtime::{Configuration, PluginFuture, Producer, Task};
/// use chrono::NaiveDateTime;
///
/// struct Lunch;
///
/// impl Producer for Lunch {
///     fn on_event<'a>(&'a self, _at: NaiveDateTime, _config: &'a Configuration) -> PluginFuture<'a, Vec<Task>> {
///         Box::pin(async { Ok(vec![Task::new("Lunch").always_offered()]) })
///     }
/// }
///
/// assert_eq!(Lunch.key(), "lunch");
/// ```
pub trait Producer: Send + Sync {
    /// Stable registry key, derived from the type name by default.
    fn key(&self) -> String {
        plugin_key(std::any::type_name::<Self>())
    }

    /// Tasks relevant at `at`.
    fn on_event<'a>(&'a self, at: NaiveDateTime, config: &'a Configuration) -> PluginFuture<'a, Vec<Task>>;
}

/// A sink for completed entries.
pub trait Consumer: Send + Sync {
    /// Stable registry key, derived from the type name by default.
    fn key(&self) -> String {
        plugin_key(std::any::type_name::<Self>())
    }

    /// Persistent consumers run first, one after another, before any other
    /// consumer sees the entry.
    fn is_persistent(&self) -> bool {
        false
    }

    fn post_event<'a>(&'a self, entry: &'a Entry, config: &'a Configuration) -> PluginFuture<'a, ()>;
}
