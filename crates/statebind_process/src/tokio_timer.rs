use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use statebind_core::timer::{TimerCallback, TimerDriver, TimerId};
use tokio::task::JoinHandle;

#[derive(Default)]
struct TimerInner {
    next_id: Cell<u64>,
    pending: RefCell<HashMap<TimerId, JoinHandle<()>>>,
}

impl Drop for TimerInner {
    fn drop(&mut self) {
        for (_, handle) in self.pending.get_mut().drain() {
            handle.abort();
        }
    }
}

/// `TimerDriver` backed by tokio: one local task per timer.
///
/// Notes:
/// - `start` spawns with `tokio::task::spawn_local`, so it must be called
///   from inside a `LocalSet`.
/// - `stop` aborts the task; the callback is dropped without running.
/// - Dropping the last clone aborts every pending timer.
#[derive(Clone, Default)]
pub struct TokioTimer {
    inner: Rc<TimerInner>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.borrow().len()
    }
}

impl TimerDriver for TokioTimer {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);

        let inner: Weak<TimerInner> = Rc::downgrade(&self.inner);
        let handle = tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.pending.borrow_mut().remove(&id);
            }
            callback();
        });
        self.inner.pending.borrow_mut().insert(id, handle);
        id
    }

    fn stop(&self, id: TimerId) {
        let handle = self.inner.pending.borrow_mut().remove(&id);
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl fmt::Debug for TokioTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioTimer")
            .field("pending", &self.pending())
            .finish()
    }
}
