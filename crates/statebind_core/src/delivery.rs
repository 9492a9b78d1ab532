use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;

type Callback<T> = Box<dyn FnMut(T)>;

/// Serial delivery cell for one subscriber.
///
/// Values are delivered in the order they were handed in, and never
/// concurrently: a `deliver()` issued from inside the callback (directly or
/// through a store write it caused) is queued and delivered once the current
/// invocation returns. After `close()` nothing is delivered, including values
/// already queued.
pub struct SerialCell<T> {
    open: Cell<bool>,
    delivering: Cell<bool>,
    pending: RefCell<VecDeque<T>>,
    callback: RefCell<Option<Callback<T>>>,
}

struct Delivering<'a>(&'a Cell<bool>);

impl Drop for Delivering<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Holds the callback while it runs and puts it back on drop, unwinding
/// included, unless the cell was closed in the meantime.
struct Running<'a, T> {
    cell: &'a SerialCell<T>,
    callback: Option<Callback<T>>,
}

impl<T> Drop for Running<'_, T> {
    fn drop(&mut self) {
        if self.cell.is_open() {
            if let Some(callback) = self.callback.take() {
                *self.cell.callback.borrow_mut() = Some(callback);
            }
        }
    }
}

impl<T> SerialCell<T> {
    pub fn new(callback: impl FnMut(T) + 'static) -> Self {
        Self {
            open: Cell::new(true),
            delivering: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
            callback: RefCell::new(Some(Box::new(callback))),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }

    pub fn deliver(&self, value: T) {
        if !self.is_open() {
            return;
        }
        self.pending.borrow_mut().push_back(value);
        if self.delivering.get() {
            return;
        }

        self.delivering.set(true);
        let _guard = Delivering(&self.delivering);

        while self.is_open() {
            let Some(value) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            // The callback is moved out while it runs so that `close()` from
            // inside it does not hit an outstanding borrow.
            let mut running = Running {
                cell: self,
                callback: self.callback.borrow_mut().take(),
            };
            let Some(callback) = running.callback.as_mut() else {
                break;
            };
            callback(value);
        }
    }

    /// Stop delivering and drop the callback. Idempotent.
    pub fn close(&self) {
        self.open.set(false);
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        let callback = self.callback.borrow_mut().take();
        drop(pending);
        drop(callback);
    }
}

impl<T> fmt::Debug for SerialCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialCell")
            .field("open", &self.is_open())
            .field("delivering", &self.delivering.get())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}
