use std::rc::Rc;

use serde_json::Value;
use statebind_core::cleanup::Cleanup;
use statebind_core::dispatch::Dispatcher;
use statebind_core::error::Result;
use statebind_core::event::{Event, EventDescriptor};
use statebind_core::fields::{Fields, WriteTarget};
use statebind_core::store::Store;
use tracing::{debug, trace};

use crate::{DispatchedEvent, Process, StateContext};

/// Store + dispatcher pair used to emit process events from one state.
///
/// Captured by trigger and timer callbacks. The collaborators are resolved
/// when the binding is created, so a missing one fails the binding call.
#[derive(Clone)]
pub(super) struct EventSink {
    process: Process,
    store: Rc<dyn Store>,
    dispatcher: Rc<dyn Dispatcher>,
    scope: String,
}

impl EventSink {
    pub(super) fn new(ctx: &StateContext) -> Result<Self> {
        let process = ctx.process();
        Ok(Self {
            store: process.store()?,
            dispatcher: process.dispatcher()?,
            process: process.clone(),
            scope: ctx.key().to_string(),
        })
    }

    /// Write the event data (if any), then dispatch the key.
    ///
    /// Returns `false` and does nothing when the descriptor has no key.
    pub(super) fn dispatch(&self, descriptor: EventDescriptor) -> bool {
        let Some(Event { key, data }) = descriptor.normalize() else {
            trace!(scope = %self.scope, "descriptor without key, nothing dispatched");
            return false;
        };

        if let Some(data) = &data {
            self.store.write(WriteTarget::Map(data.clone()), Value::Null);
        }

        debug!(scope = %self.scope, event = %key, "dispatch");
        self.dispatcher.dispatch(&key);

        self.process.publish_dispatched(DispatchedEvent {
            key,
            data,
            scope: Some(self.scope.clone()),
        });
        true
    }
}

impl StateContext {
    /// Dispatch a process event now.
    ///
    /// Data carried by the descriptor is written to the store before the key
    /// reaches the dispatcher. `Ok(false)` means the descriptor had no key.
    pub fn dispatch_event(&self, descriptor: impl Into<EventDescriptor>) -> Result<bool> {
        Ok(EventSink::new(self)?.dispatch(descriptor.into()))
    }

    /// Derive events from changes of `fields` while this state is active.
    ///
    /// `compute(current, previous)` runs on every delivery, including the
    /// initial one; `None` suppresses the event. Equal consecutive values are
    /// not filtered here.
    pub fn trigger<F>(&self, fields: impl Into<Fields>, mut compute: F) -> Result<Cleanup>
    where
        F: FnMut(&Value, Option<&Value>) -> Option<EventDescriptor> + 'static,
    {
        let sink = EventSink::new(self)?;
        self.with_data(fields, move |current, previous| {
            if let Some(descriptor) = compute(current, previous) {
                sink.dispatch(descriptor);
            }
        })
    }
}
