use std::cell::{Cell, RefCell};
use std::fmt;

type Stop = Box<dyn FnOnce()>;

/// Cancel latch for a resource that is acquired asynchronously.
///
/// Two pieces of state: a `terminated` flag and an optional `stop` capability.
/// - `terminate()`: marks the latch terminated and runs `stop` if it was armed
/// - `arm(stop)`: runs `stop` right away if already terminated, else keeps it
///
/// Whichever of the two happens first, the resource ends up stopped exactly
/// once. Cancel-before-acquire and cancel-after-acquire converge.
#[derive(Default)]
pub struct StopLatch {
    terminated: Cell<bool>,
    stop: RefCell<Option<Stop>>,
}

impl StopLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.get()
    }

    pub fn is_armed(&self) -> bool {
        self.stop.borrow().is_some()
    }

    /// Hand over the stop capability of a freshly acquired resource.
    ///
    /// Arming twice stops the previously armed resource.
    pub fn arm(&self, stop: impl FnOnce() + 'static) {
        if self.is_terminated() {
            stop();
            return;
        }
        let previous = self.stop.borrow_mut().replace(Box::new(stop));
        if let Some(previous) = previous {
            previous();
        }
    }

    /// Idempotent.
    pub fn terminate(&self) {
        self.terminated.set(true);
        let stop = self.stop.borrow_mut().take();
        if let Some(stop) = stop {
            stop();
        }
    }
}

impl fmt::Debug for StopLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopLatch")
            .field("terminated", &self.is_terminated())
            .field("armed", &self.is_armed())
            .finish()
    }
}
