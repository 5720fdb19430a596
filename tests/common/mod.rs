//! Shared helpers for registry integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use dynmod::module::{
    ChannelEventSink, DynamicModule, ModuleEvent, ModuleRegistry, StaticProvider,
};
use dynmod::state::MemoryStateStore;

/// Scripted in-process module whose unload calls are observable.
pub struct TestModule {
    name: String,
    incompatible_with: Vec<String>,
    enabled: bool,
    unloads: Arc<AtomicUsize>,
}

impl TestModule {
    pub fn new(name: &str, incompatible_with: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            incompatible_with: incompatible_with.iter().map(|s| s.to_string()).collect(),
            enabled: false,
            unloads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Share an unload counter with the test body.
    pub fn with_unload_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.unloads = counter;
        self
    }

    pub fn boxed(self) -> Box<dyn DynamicModule> {
        Box::new(self)
    }
}

#[async_trait]
impl DynamicModule for TestModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn incompatible_with(&self) -> &[String] {
        &self.incompatible_with
    }

    async fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        true
    }

    async fn disable(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn unload(&mut self) {
        self.unloads.fetch_add(1, Ordering::SeqCst);
    }
}

/// Registry wired to an in-memory store and an event channel.
pub struct RegistryFixture {
    pub registry: ModuleRegistry,
    pub store: MemoryStateStore,
    pub events: UnboundedReceiver<ModuleEvent>,
}

impl RegistryFixture {
    pub async fn with_modules(modules: Vec<Box<dyn DynamicModule>>) -> Self {
        Self::with_modules_and_store(modules, MemoryStateStore::new()).await
    }

    pub async fn with_modules_and_store(
        modules: Vec<Box<dyn DynamicModule>>,
        store: MemoryStateStore,
    ) -> Self {
        let (sink, events) = ChannelEventSink::new();
        let registry = ModuleRegistry::new(Box::new(store.clone()), Arc::new(sink));
        let mut provider = StaticProvider::new(modules.into_iter().map(Ok).collect());
        registry.discover(&mut provider).await;
        Self {
            registry,
            store,
            events,
        }
    }

    /// Names of the modules currently reported enabled.
    pub async fn enabled_names(&self) -> Vec<String> {
        self.registry
            .status()
            .await
            .into_iter()
            .filter(|s| s.enabled)
            .map(|s| s.name)
            .collect()
    }

    /// Drain every event emitted so far.
    pub fn drain_events(&mut self) -> Vec<ModuleEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}
