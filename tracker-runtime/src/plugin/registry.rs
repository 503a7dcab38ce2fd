use super::r#trait::{Consumer, Producer};
use std::sync::Arc;
use tracing::{debug, info};

/// What a plugin is registered as.
pub enum Capability {
    Producer(Arc<dyn Producer>),
    Consumer(Arc<dyn Consumer>),
}

/// Plugins known to the aggregator, in registration order.
///
/// Built once at startup and shared behind an `Arc`; there is no way to
/// register through a shared reference.
#[derive(Default)]
pub struct PluginRegistry {
    producers: Vec<(String, Arc<dyn Producer>)>,
    consumers: Vec<(String, Arc<dyn Consumer>)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin under its derived key.
    ///
    /// Registering a second plugin with the same key replaces the first but
    /// keeps its position.
    pub fn register(&mut self, capability: Capability) -> &mut Self {
        match capability {
            Capability::Producer(producer) => {
                let key = producer.key();
                info!(key = %key, "Registering producer");
                upsert(&mut self.producers, key, producer);
            }
            Capability::Consumer(consumer) => {
                let key = consumer.key();
                info!(key = %key, persistent = consumer.is_persistent(), "Registering consumer");
                upsert(&mut self.consumers, key, consumer);
            }
        }
        self
    }

    pub fn register_producer<P: Producer + 'static>(&mut self, producer: P) -> &mut Self {
        self.register(Capability::Producer(Arc::new(producer)))
    }

    pub fn register_consumer<C: Consumer + 'static>(&mut self, consumer: C) -> &mut Self {
        self.register(Capability::Consumer(Arc::new(consumer)))
    }

    /// Register one instance into both registries.
    pub fn register_plugin<T>(&mut self, plugin: Arc<T>) -> &mut Self
    where
        T: Producer + Consumer + 'static,
    {
        self.register(Capability::Producer(plugin.clone()));
        self.register(Capability::Consumer(plugin))
    }

    pub fn producers(&self) -> impl Iterator<Item = &Arc<dyn Producer>> + '_ {
        self.producers.iter().map(|(_, producer)| producer)
    }

    pub fn consumers(&self) -> impl Iterator<Item = &Arc<dyn Consumer>> + '_ {
        self.consumers.iter().map(|(_, consumer)| consumer)
    }

    pub fn producer(&self, key: &str) -> Option<&Arc<dyn Producer>> {
        self.producers.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    pub fn consumer(&self, key: &str) -> Option<&Arc<dyn Consumer>> {
        self.consumers.iter().find(|(k, _)| k == key).map(|(_, c)| c)
    }

    pub fn producer_keys(&self) -> Vec<&str> {
        self.producers.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn consumer_keys(&self) -> Vec<&str> {
        self.consumers.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty() && self.consumers.is_empty()
    }
}

fn upsert<T: ?Sized>(entries: &mut Vec<(String, Arc<T>)>, key: String, plugin: Arc<T>) {
    if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
        debug!(key = %key, "Replacing previously registered plugin");
        slot.1 = plugin;
    } else {
        entries.push((key, plugin));
    }
}
