use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use statebind_core::cleanup::Cleanup;
use statebind_core::delivery::SerialCell;
use statebind_core::services::{Service, ServiceListCallback, ServiceRegistry};
use tracing::trace;

type ConsumerCell = Rc<SerialCell<Vec<Service>>>;

#[derive(Default)]
struct ServicesInner {
    next_id: Cell<u64>,
    providers: RefCell<HashMap<String, Vec<(u64, Service)>>>,
    consumers: RefCell<HashMap<String, Vec<(u64, ConsumerCell)>>>,
    outbox: RefCell<VecDeque<(ConsumerCell, Vec<Service>)>>,
    notifying: Cell<bool>,
}

struct Notifying<'a>(&'a Cell<bool>);

impl Drop for Notifying<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl ServicesInner {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn list(&self, key: &str) -> Vec<Service> {
        self.providers
            .borrow()
            .get(key)
            .map(|p| p.iter().map(|(_, s)| Rc::clone(s)).collect())
            .unwrap_or_default()
    }

    /// Queue the current list for every consumer of `key`, then drain the
    /// registry-wide queue unless a drain is already running further up.
    fn notify(&self, key: &str) {
        let list = self.list(key);
        if let Some(consumers) = self.consumers.borrow().get(key) {
            self.outbox.borrow_mut().extend(
                consumers
                    .iter()
                    .map(|(_, cell)| (Rc::clone(cell), list.clone())),
            );
        }
        if self.notifying.replace(true) {
            return;
        }
        let _guard = Notifying(&self.notifying);

        loop {
            let Some((cell, list)) = self.outbox.borrow_mut().pop_front() else {
                break;
            };
            cell.deliver(list);
        }
    }

    fn remove_provider(&self, key: &str, id: u64) {
        let mut providers = self.providers.borrow_mut();
        if let Some(entries) = providers.get_mut(key) {
            entries.retain(|(p, _)| *p != id);
            if entries.is_empty() {
                providers.remove(key);
            }
        }
    }

    fn remove_consumer(&self, key: &str, id: u64) {
        let mut consumers = self.consumers.borrow_mut();
        if let Some(entries) = consumers.get_mut(key) {
            entries.retain(|(c, _)| *c != id);
            if entries.is_empty() {
                consumers.remove(key);
            }
        }
    }
}

/// In-process `ServiceRegistry`.
///
/// Contributions under a key are listed in registration order. Consumers get
/// the whole list on registration and after every change. Cloning shares the
/// registry.
#[derive(Clone, Default)]
pub struct MemoryServices {
    inner: Rc<ServicesInner>,
}

impl MemoryServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_count(&self, key: &str) -> usize {
        self.inner.providers.borrow().get(key).map_or(0, Vec::len)
    }

    pub fn consumer_count(&self, key: &str) -> usize {
        self.inner.consumers.borrow().get(key).map_or(0, Vec::len)
    }

    /// Keys with at least one provider or consumer registered.
    pub fn key_count(&self) -> usize {
        let providers = self.inner.providers.borrow();
        let consumers = self.inner.consumers.borrow();
        providers.len()
            + consumers
                .keys()
                .filter(|key| !providers.contains_key(*key))
                .count()
    }
}

impl ServiceRegistry for MemoryServices {
    fn new_provider(&self, key: &str, service: Service) -> Cleanup {
        let id = self.inner.next_id();
        self.inner
            .providers
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push((id, service));
        trace!(service = %key, provider = id, "provider added");
        self.inner.notify(key);

        let inner: Weak<ServicesInner> = Rc::downgrade(&self.inner);
        let key = key.to_string();
        Cleanup::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove_provider(&key, id);
                trace!(service = %key, provider = id, "provider removed");
                inner.notify(&key);
            }
        })
    }

    fn new_consumer(&self, key: &str, mut consumer: ServiceListCallback) -> Cleanup {
        let id = self.inner.next_id();
        let cell: ConsumerCell = Rc::new(SerialCell::new(move |list: Vec<Service>| consumer(&list)));
        self.inner
            .consumers
            .borrow_mut()
            .entry(key.to_string())
            .or_default()
            .push((id, Rc::clone(&cell)));
        trace!(service = %key, consumer = id, "consumer added");

        cell.deliver(self.inner.list(key));

        let inner: Weak<ServicesInner> = Rc::downgrade(&self.inner);
        let key = key.to_string();
        Cleanup::new(move || {
            cell.close();
            if let Some(inner) = inner.upgrade() {
                inner.remove_consumer(&key, id);
            }
        })
    }
}

impl fmt::Debug for MemoryServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryServices")
            .field("keys", &self.key_count())
            .finish()
    }
}
