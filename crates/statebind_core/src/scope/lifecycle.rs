use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::Result;

use super::phase::{self, Phase, Transition};

type Hook = Box<dyn FnOnce()>;

struct ScopeInner {
    key: String,
    phase: Cell<Phase>,
    on_activate: RefCell<VecDeque<Hook>>,
    on_deactivate: RefCell<Vec<Hook>>,
}

/// Activation interval of one state instance.
///
/// The process engine calls `activate()` when the state is entered and
/// `deactivate()` when it is left. Bindings register hook pairs in between.
///
/// Hook ordering:
/// - activation hooks run in registration order
/// - deactivation hooks run as a release stack (last registered, first run)
/// - every hook runs at most once, synchronously, to completion
///
/// Late registration keeps acquire/release pairs balanced: an activation hook
/// registered while `Active` runs immediately, one registered after disposal
/// is dropped, and a deactivation hook registered after disposal runs
/// immediately.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

impl Scope {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                key: key.into(),
                phase: Cell::new(Phase::Uninitialized),
                on_activate: RefCell::new(VecDeque::new()),
                on_deactivate: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Key of the state this scope belongs to.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }

    pub fn is_disposed(&self) -> bool {
        self.phase() == Phase::Disposed
    }

    pub fn on_activate(&self, hook: impl FnOnce() + 'static) {
        match self.phase() {
            Phase::Uninitialized => self.inner.on_activate.borrow_mut().push_back(Box::new(hook)),
            Phase::Active => hook(),
            Phase::Disposed => trace!(scope = %self.key(), "activation hook after dispose dropped"),
        }
    }

    pub fn on_deactivate(&self, hook: impl FnOnce() + 'static) {
        match self.phase() {
            Phase::Uninitialized | Phase::Active => {
                self.inner.on_deactivate.borrow_mut().push(Box::new(hook))
            }
            Phase::Disposed => hook(),
        }
    }

    /// Enter `Active` and run activation hooks in registration order.
    ///
    /// Stops early if a hook deactivates this scope.
    pub fn activate(&self) -> Result<()> {
        let next = phase::next(self.phase(), Transition::Activate)?;
        self.inner.phase.set(next);
        debug!(scope = %self.key(), "activate");

        while self.is_active() {
            // The borrow ends before the hook runs: hooks may register more hooks.
            let hook = self.inner.on_activate.borrow_mut().pop_front();
            match hook {
                Some(hook) => hook(),
                None => break,
            }
        }
        Ok(())
    }

    /// Enter `Disposed` and unwind the release stack.
    ///
    /// Safe to call from inside a hook or a change callback of this scope, and
    /// idempotent: a second call does nothing.
    pub fn deactivate(&self) {
        let next = match phase::next(self.phase(), Transition::Deactivate) {
            Ok(next) => next,
            Err(_) => {
                trace!(scope = %self.key(), "deactivate on disposed scope ignored");
                return;
            }
        };
        self.inner.phase.set(next);
        debug!(scope = %self.key(), "deactivate");

        let pending = std::mem::take(&mut *self.inner.on_activate.borrow_mut());
        drop(pending);

        loop {
            let hook = self.inner.on_deactivate.borrow_mut().pop();
            match hook {
                Some(hook) => hook(),
                None => break,
            }
        }
    }

    /// Number of release hooks still waiting for deactivation.
    pub fn pending_releases(&self) -> usize {
        self.inner.on_deactivate.borrow().len()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("key", &self.key())
            .field("phase", &self.phase())
            .finish()
    }
}
