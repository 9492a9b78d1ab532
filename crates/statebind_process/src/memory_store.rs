use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use statebind_core::cleanup::Cleanup;
use statebind_core::delivery::SerialCell;
use statebind_core::fields::Fields;
use statebind_core::store::{ChangeCallback, Store};
use tracing::trace;

struct Subscriber {
    id: u64,
    fields: Fields,
    cell: Rc<SerialCell<Value>>,
}

type Delivery = (Rc<SerialCell<Value>>, Value);

#[derive(Default)]
struct StoreInner {
    values: RefCell<HashMap<String, Value>>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    outbox: RefCell<VecDeque<Delivery>>,
    notifying: Cell<bool>,
}

struct Notifying<'a>(&'a Cell<bool>);

impl Drop for Notifying<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl StoreInner {
    fn lookup(&self, name: &str) -> Value {
        self.values.borrow().get(name).cloned().unwrap_or(Value::Null)
    }

    /// Notify every subscriber of any of `names`, once each.
    ///
    /// Values are shaped at write time and queued store-wide. A write made
    /// from inside a callback is queued behind the deliveries of the write
    /// that caused it, so every subscriber sees writes in the order they
    /// were applied.
    fn notify(&self, names: &[&str]) {
        {
            let subscribers = self.subscribers.borrow();
            let mut outbox = self.outbox.borrow_mut();
            outbox.extend(
                subscribers
                    .iter()
                    .filter(|s| names.iter().any(|n| s.fields.contains(n)))
                    .map(|s| (Rc::clone(&s.cell), s.fields.shape(|n| self.lookup(n)))),
            );
        }
        if self.notifying.replace(true) {
            return;
        }
        let _guard = Notifying(&self.notifying);

        loop {
            let Some((cell, value)) = self.outbox.borrow_mut().pop_front() else {
                break;
            };
            cell.deliver(value);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.borrow_mut().retain(|s| s.id != id);
    }
}

/// In-process `Store`: a field map plus a subscriber list.
///
/// Every write notifies (no equality filter). Deliveries are drained from
/// one store-wide FIFO queue. Cloning shares the store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Rc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions that include `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.fields.contains(name))
            .count()
    }

    /// Snapshot of every field that was ever written.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.inner
            .values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Store for MemoryStore {
    fn get(&self, name: &str) -> Value {
        self.inner.lookup(name)
    }

    fn get_all(&self, names: &[String]) -> Map<String, Value> {
        names
            .iter()
            .map(|n| (n.clone(), self.inner.lookup(n)))
            .collect()
    }

    fn set(&self, name: &str, value: Value) {
        self.inner
            .values
            .borrow_mut()
            .insert(name.to_string(), value);
        self.inner.notify(&[name]);
    }

    fn set_all(&self, assignments: Vec<(String, Value)>) {
        if assignments.is_empty() {
            return;
        }
        let names: Vec<String> = assignments.iter().map(|(n, _)| n.clone()).collect();
        self.inner.values.borrow_mut().extend(assignments);

        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        self.inner.notify(&names);
    }

    fn subscribe(&self, fields: &Fields, callback: ChangeCallback) -> Cleanup {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let cell = Rc::new(SerialCell::new(callback));
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            fields: fields.clone(),
            cell: Rc::clone(&cell),
        });
        trace!(subscription = id, fields = ?fields.names(), "store subscribe");

        cell.deliver(fields.shape(|n| self.inner.lookup(n)));

        let inner: Weak<StoreInner> = Rc::downgrade(&self.inner);
        Cleanup::new(move || {
            cell.close();
            if let Some(inner) = inner.upgrade() {
                inner.unsubscribe(id);
            }
            trace!(subscription = id, "store unsubscribe");
        })
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("fields", &self.inner.values.borrow().len())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}
