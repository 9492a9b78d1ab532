use std::fmt;
use std::rc::Rc;

use statebind_core::services::ServiceRegistry;
use statebind_core::store::Store;
use statebind_core::timer::TimerDriver;

use crate::{MemoryServices, MemoryStore, TokioTimer};

/// Event key dispatched by `StateContext::timeout` when no descriptor is given.
pub const DEFAULT_TIMEOUT_EVENT: &str = "ok";

/// Capacity of the dispatched-event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 32;

/// Collaborators and defaults handed to a process once, at construction.
///
/// Every collaborator is optional:
/// - store / services left empty must be attached later with
///   `Process::init_store` / `Process::init_services` before any binding needs them
/// - timer left empty falls back to `TokioTimer` on first use, when a tokio
///   runtime is current; otherwise timer bindings fail with `NotInitialized`
#[derive(Clone)]
pub struct ProcessConfig {
    pub store: Option<Rc<dyn Store>>,
    pub services: Option<Rc<dyn ServiceRegistry>>,
    pub timer: Option<Rc<dyn TimerDriver>>,
    pub timeout_event: String,
    pub event_channel_capacity: usize,
}

impl ProcessConfig {
    /// Config with the in-process reference collaborators filled in.
    pub fn with_defaults() -> Self {
        Self::default()
            .store(Rc::new(MemoryStore::new()))
            .services(Rc::new(MemoryServices::new()))
            .timer(Rc::new(TokioTimer::new()))
    }

    pub fn store(mut self, store: Rc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn services(mut self, services: Rc<dyn ServiceRegistry>) -> Self {
        self.services = Some(services);
        self
    }

    pub fn timer(mut self, timer: Rc<dyn TimerDriver>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn timeout_event(mut self, key: impl Into<String>) -> Self {
        self.timeout_event = key.into();
        self
    }

    /// Zero is bumped to one (tokio broadcast channels need a non-zero capacity).
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            store: None,
            services: None,
            timer: None,
            timeout_event: DEFAULT_TIMEOUT_EVENT.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl fmt::Debug for ProcessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessConfig")
            .field("store", &self.store.is_some())
            .field("services", &self.services.is_some())
            .field("timer", &self.timer.is_some())
            .field("timeout_event", &self.timeout_event)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish()
    }
}
