use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use statebind_core::dispatch::Dispatcher;
use statebind_core::error::{CoreError, Domain, Result};
use statebind_core::fields::{Fields, WriteTarget};
use statebind_core::scope::Scope;
use statebind_core::services::ServiceRegistry;
use statebind_core::store::Store;
use statebind_core::timer::TimerDriver;
use tokio::sync::broadcast;
use tracing::debug;

use crate::binding::DataHandle;
use crate::{
    DispatchedEvent, MemoryServices, MemoryStore, ProcessConfig, StateContext, TokioTimer,
};

struct ProcessInner {
    name: String,
    store: OnceCell<Rc<dyn Store>>,
    services: OnceCell<Rc<dyn ServiceRegistry>>,
    timer: OnceCell<Rc<dyn TimerDriver>>,
    dispatcher: OnceCell<Rc<dyn Dispatcher>>,
    timeout_event: String,

    // broadcast is used so that dispatch never blocks on a slow observer and
    // lagging receivers drop old records instead of stalling bindings.
    dispatched: broadcast::Sender<DispatchedEvent>,
}

/// Process-wide context shared by every state.
///
/// Holds one slot per collaborator (store, service registry, timer driver,
/// dispatcher). Each slot is filled at most once, either from the
/// `ProcessConfig` or by the matching `init_*` / `attach_*` call, and is then
/// reached by every state through its `StateContext`.
#[derive(Clone)]
pub struct Process {
    inner: Rc<ProcessInner>,
}

impl Process {
    /// Create a process with nothing attached.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, ProcessConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: ProcessConfig) -> Self {
        let (dispatched, _rx) = broadcast::channel(config.event_channel_capacity.max(1));
        let inner = ProcessInner {
            name: name.into(),
            store: OnceCell::new(),
            services: OnceCell::new(),
            timer: OnceCell::new(),
            dispatcher: OnceCell::new(),
            timeout_event: config.timeout_event,
            dispatched,
        };
        if let Some(store) = config.store {
            let _ = inner.store.set(store);
        }
        if let Some(services) = config.services {
            let _ = inner.services.set(services);
        }
        if let Some(timer) = config.timer {
            let _ = inner.timer.set(timer);
        }
        debug!(process = %inner.name, "process created");
        Self {
            inner: Rc::new(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ---------------- Collaborator slots ----------------

    /// Attach the shared store; `None` attaches a fresh `MemoryStore`.
    pub fn init_store(&self, store: Option<Rc<dyn Store>>) -> Result<Rc<dyn Store>> {
        let store = store.unwrap_or_else(|| Rc::new(MemoryStore::new()) as Rc<dyn Store>);
        self.inner
            .store
            .set(Rc::clone(&store))
            .map_err(|_| CoreError::already_initialized(Domain::Store, "store"))?;
        debug!(process = %self.name(), "store attached");
        Ok(store)
    }

    /// Attach the service registry; `None` attaches a fresh `MemoryServices`.
    pub fn init_services(
        &self,
        services: Option<Rc<dyn ServiceRegistry>>,
    ) -> Result<Rc<dyn ServiceRegistry>> {
        let services =
            services.unwrap_or_else(|| Rc::new(MemoryServices::new()) as Rc<dyn ServiceRegistry>);
        self.inner
            .services
            .set(Rc::clone(&services))
            .map_err(|_| CoreError::already_initialized(Domain::Services, "services"))?;
        debug!(process = %self.name(), "services attached");
        Ok(services)
    }

    /// Attach the timer driver. Must happen before the first timer binding is
    /// created, since that falls back to `TokioTimer`.
    pub fn init_timer(&self, timer: Rc<dyn TimerDriver>) -> Result<()> {
        self.inner
            .timer
            .set(timer)
            .map_err(|_| CoreError::already_initialized(Domain::Timer, "timer"))?;
        debug!(process = %self.name(), "timer attached");
        Ok(())
    }

    /// Attach the process engine's dispatch entry point.
    pub fn attach_dispatcher(&self, dispatcher: Rc<dyn Dispatcher>) -> Result<()> {
        self.inner
            .dispatcher
            .set(dispatcher)
            .map_err(|_| CoreError::already_initialized(Domain::Config, "dispatcher"))
    }

    pub fn store(&self) -> Result<Rc<dyn Store>> {
        self.inner
            .store
            .get()
            .cloned()
            .ok_or_else(|| CoreError::not_initialized(Domain::Config, "store"))
    }

    pub fn services(&self) -> Result<Rc<dyn ServiceRegistry>> {
        self.inner
            .services
            .get()
            .cloned()
            .ok_or_else(|| CoreError::not_initialized(Domain::Config, "services"))
    }

    /// The attached timer driver, or `TokioTimer` installed on first use.
    ///
    /// The fallback needs a tokio runtime on this thread (and a `LocalSet`
    /// around the code that activates timer bindings). Without a runtime
    /// and without an attached driver this is `Timer`/`NotInitialized`.
    pub fn timer(&self) -> Result<Rc<dyn TimerDriver>> {
        if let Some(timer) = self.inner.timer.get() {
            return Ok(Rc::clone(timer));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CoreError::not_initialized(Domain::Timer, "timer"));
        }
        debug!(process = %self.name(), "falling back to tokio timer");
        Ok(Rc::clone(
            self.inner
                .timer
                .get_or_init(|| Rc::new(TokioTimer::new()) as Rc<dyn TimerDriver>),
        ))
    }

    pub fn dispatcher(&self) -> Result<Rc<dyn Dispatcher>> {
        self.inner
            .dispatcher
            .get()
            .cloned()
            .ok_or_else(|| CoreError::not_initialized(Domain::Config, "dispatcher"))
    }

    pub fn timeout_event(&self) -> &str {
        &self.inner.timeout_event
    }

    // ---------------- Process-level data access ----------------

    pub fn get_data(&self, fields: impl Into<Fields>) -> Result<Value> {
        Ok(self.store()?.read(&fields.into()))
    }

    pub fn set_data(&self, target: impl Into<WriteTarget>, value: Value) -> Result<()> {
        self.store()?.write(target.into(), value);
        Ok(())
    }

    /// Getter/setter pair bound to `fields`.
    pub fn use_data(&self, fields: impl Into<Fields>) -> Result<DataHandle> {
        Ok(DataHandle::new(self.store()?, fields.into()))
    }

    // ---------------- States ----------------

    /// Binding context for a state of this process.
    pub fn state(&self, scope: Scope) -> StateContext {
        StateContext::new(self.clone(), scope)
    }

    // ---------------- Dispatched events ----------------

    /// Subscribe to records of events dispatched by bindings.
    pub fn subscribe_dispatched_events(&self) -> broadcast::Receiver<DispatchedEvent> {
        self.inner.dispatched.subscribe()
    }

    pub(crate) fn publish_dispatched(&self, event: DispatchedEvent) {
        // No receivers / lagging receivers are fine.
        let _ = self.inner.dispatched.send(event);
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.inner.name)
            .field("store", &self.inner.store.get().is_some())
            .field("services", &self.inner.services.get().is_some())
            .field("timer", &self.inner.timer.get().is_some())
            .field("dispatcher", &self.inner.dispatcher.get().is_some())
            .finish()
    }
}
