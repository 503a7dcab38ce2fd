use crate::config::Configuration;
use crate::error::{panic_message, PluginError};
use crate::plugin::PluginRegistry;
use crate::task::{Entry, Task};
use chrono::NaiveDateTime;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, error, warn};

/// Fans popup events out to the registered plugins.
#[derive(Clone)]
pub struct EventAggregator {
    registry: Arc<PluginRegistry>,
}

impl EventAggregator {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Ask every producer for its tasks at `at` and merge the answers.
    ///
    /// Producers run concurrently but their results are merged in registration
    /// order. A producer that fails, times out or panics contributes nothing.
    pub async fn collect_tasks(&self, at: NaiveDateTime, config: Arc<Configuration>) -> TaskList {
        let timeout = config.plugin_timeout();

        let pending: Vec<_> = self
            .registry
            .producers()
            .map(|producer| {
                let key = producer.key();
                let producer = producer.clone();
                let config = config.clone();
                let handle = tokio::spawn(with_timeout(timeout, async move {
                    producer.on_event(at, &config).await
                }));
                (key, handle)
            })
            .collect();

        let mut list = TaskList::default();
        let mut sources = 0usize;

        for (key, handle) in pending {
            sources += 1;
            match flatten(handle.await) {
                Ok(tasks) => {
                    debug!(producer = %key, tasks = tasks.len(), "Producer answered");
                    list.merge(tasks);
                }
                Err(e) => {
                    warn!(producer = %key, error = %e, "Producer failed, skipping its tasks");
                    list.failed_sources.push(key);
                }
            }
        }

        list.sources = sources;
        if list.all_sources_failed() {
            error!(producers = sources, "Every task source failed");
        }

        list
    }

    /// Hand a completed entry to every consumer.
    ///
    /// Persistent consumers run first, in registration order, and finish before
    /// any other consumer starts. The rest run concurrently.
    pub async fn dispatch_entry(&self, entry: Entry, config: Arc<Configuration>) -> DispatchReport {
        let timeout = config.plugin_timeout();
        let entry = Arc::new(entry);
        let mut report = DispatchReport::default();

        for consumer in self.registry.consumers().filter(|c| c.is_persistent()) {
            let key = consumer.key();
            let consumer = consumer.clone();
            let (entry, config) = (entry.clone(), config.clone());
            let outcome = tokio::spawn(with_timeout(timeout, async move {
                consumer.post_event(&entry, &config).await
            }))
            .await;

            match flatten(outcome) {
                Ok(()) => report.delivered.push(key),
                Err(e) => {
                    error!(consumer = %key, error = %e, "Failed to persist entry");
                    report.failures.push(ConsumerFailure {
                        consumer: key,
                        persistent: true,
                        error: e,
                    });
                }
            }
        }

        let pending: Vec<_> = self
            .registry
            .consumers()
            .filter(|c| !c.is_persistent())
            .map(|consumer| {
                let key = consumer.key();
                let consumer = consumer.clone();
                let (entry, config) = (entry.clone(), config.clone());
                let handle = tokio::spawn(with_timeout(timeout, async move {
                    consumer.post_event(&entry, &config).await
                }));
                (key, handle)
            })
            .collect();

        for (key, handle) in pending {
            match flatten(handle.await) {
                Ok(()) => report.delivered.push(key),
                Err(e) => {
                    warn!(consumer = %key, error = %e, "Consumer failed");
                    report.failures.push(ConsumerFailure {
                        consumer: key,
                        persistent: false,
                        error: e,
                    });
                }
            }
        }

        report
    }
}

async fn with_timeout<T, F>(limit: Duration, future: F) -> Result<T, PluginError>
where
    F: Future<Output = Result<T, PluginError>>,
{
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or(Err(PluginError::Timeout(limit)))
}

fn flatten<T>(joined: Result<Result<T, PluginError>, JoinError>) -> Result<T, PluginError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(PluginError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(PluginError::failed(e)),
    }
}

/// Merged answer of every producer for one popup.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    failed_sources: Vec<String>,
    sources: usize,
}

impl TaskList {
    /// Build a list as if a single producer had returned `tasks`.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut list = Self {
            sources: 1,
            ..Self::default()
        };
        list.merge(tasks);
        list
    }

    fn merge(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            match self.tasks.iter_mut().find(|t| t.name == task.name) {
                Some(existing) => {
                    for detail in task.details {
                        if !existing.details.contains(&detail) {
                            existing.details.push(detail);
                        }
                    }
                }
                None => {
                    let mut task = task;
                    let mut seen = Vec::with_capacity(task.details.len());
                    task.details.retain(|d| {
                        if seen.contains(d) {
                            false
                        } else {
                            seen.push(d.clone());
                            true
                        }
                    });
                    self.tasks.push(task);
                }
            }
        }
    }

    /// Merged tasks in producer order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task and detail the popup should open with.
    ///
    /// The first task with priority `0` wins, then the first default task.
    pub fn default_selection(&self) -> Option<(&str, &str)> {
        self.tasks
            .iter()
            .find(|t| t.priority == Task::PREFILL_PRIORITY)
            .or_else(|| self.tasks.iter().find(|t| t.is_default))
            .map(|t| {
                let detail = t.details.first().map(String::as_str).unwrap_or("");
                (t.name.as_str(), detail)
            })
    }

    /// Tasks sorted by priority for the dropdown, ties kept in merge order.
    pub fn dropdown_options(&self) -> Vec<(String, Vec<String>)> {
        let mut ordered: Vec<&Task> = self.tasks.iter().collect();
        ordered.sort_by_key(|t| t.priority);
        ordered
            .into_iter()
            .map(|t| (t.name.clone(), t.details.clone()))
            .collect()
    }

    /// Keys of the producers that failed this pass.
    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }

    pub fn all_sources_failed(&self) -> bool {
        self.sources > 0 && self.failed_sources.len() == self.sources
    }
}

/// A consumer that did not accept an entry.
#[derive(Debug)]
pub struct ConsumerFailure {
    pub consumer: String,
    pub persistent: bool,
    pub error: PluginError,
}

/// Outcome of dispatching one entry.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Consumers that accepted the entry, persistent ones first.
    pub delivered: Vec<String>,
    pub failures: Vec<ConsumerFailure>,
}

impl DispatchReport {
    /// The first failure of a persistent consumer, if any.
    pub fn persistence_failure(&self) -> Option<&ConsumerFailure> {
        self.failures.iter().find(|f| f.persistent)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
