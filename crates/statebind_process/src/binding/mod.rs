//! Per-component bindings.
//!
//! Every binding follows the same phase machine (`Uninitialized -> Active ->
//! Disposed`, see `statebind_core::scope::Phase`): resources are acquired by
//! the activation hook and released by the paired deactivation hook, both
//! registered in the same call. `BindingSlot` owns that bookkeeping.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use statebind_core::cleanup::Cleanup;
use statebind_core::scope::{self, Phase, Scope, Transition};

mod data;
mod observation;
mod services;
mod subscription;
mod timer;
mod trigger;

pub use data::DataHandle;
pub use observation::{Mapped, Observation};
use trigger::EventSink;

/// Phase + release handle of one binding.
struct BindingSlot {
    phase: Cell<Phase>,
    release: RefCell<Option<Cleanup>>,
}

impl BindingSlot {
    fn new() -> Self {
        Self {
            phase: Cell::new(Phase::Uninitialized),
            release: RefCell::new(None),
        }
    }

    fn acquire<F>(self: &Rc<Self>, acquire: F)
    where
        F: FnOnce(Liveness) -> Cleanup,
    {
        let Ok(next) = scope::next(self.phase.get(), Transition::Activate) else {
            return;
        };
        self.phase.set(next);

        let cleanup = acquire(Liveness(Rc::downgrade(self)));

        // Released while acquiring (e.g. a synchronous first delivery caused the
        // scope to exit): nothing will ever run the handle, so run it now.
        if self.phase.get().is_terminal() {
            cleanup.run();
        } else {
            *self.release.borrow_mut() = Some(cleanup);
        }
    }

    fn release(&self) {
        let Ok(next) = scope::next(self.phase.get(), Transition::Deactivate) else {
            return;
        };
        self.phase.set(next);
        let cleanup = self.release.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }
    }
}

/// Weak view of a binding's phase, captured by callbacks the binding installs.
///
/// Callbacks check it before running user code so that nothing reaches a
/// binding once it is disposed, even before its release handle exists.
#[derive(Clone)]
pub(crate) struct Liveness(Weak<BindingSlot>);

impl Liveness {
    pub(crate) fn is_active(&self) -> bool {
        self.0
            .upgrade()
            .is_some_and(|slot| slot.phase.get() == Phase::Active)
    }
}

/// Register an acquire/release pair on `scope`.
///
/// Returns a handle that releases the binding early. Run before activation,
/// it prevents the acquisition altogether.
pub(crate) fn bind<F>(scope: &Scope, acquire: F) -> Cleanup
where
    F: FnOnce(Liveness) -> Cleanup + 'static,
{
    let slot = Rc::new(BindingSlot::new());

    let on_activate = Rc::clone(&slot);
    scope.on_activate(move || on_activate.acquire(acquire));

    let on_deactivate = Rc::clone(&slot);
    scope.on_deactivate(move || on_deactivate.release());

    Cleanup::new(move || slot.release())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_on_activate_release_on_deactivate() {
        let scope = Scope::new("S");
        let released = Rc::new(Cell::new(false));
        let r = Rc::clone(&released);

        bind(&scope, move |_| Cleanup::new(move || r.set(true)));
        assert!(!released.get());

        scope.activate().unwrap();
        assert!(!released.get());

        scope.deactivate();
        assert!(released.get());
    }

    #[test]
    fn early_release_skips_acquisition() {
        let scope = Scope::new("S");
        let acquired = Rc::new(Cell::new(false));
        let a = Rc::clone(&acquired);

        let cleanup = bind(&scope, move |_| {
            a.set(true);
            Cleanup::noop()
        });
        cleanup.run();
        scope.activate().unwrap();

        assert!(!acquired.get());
    }

    #[test]
    fn release_during_acquisition_runs_cleanup_immediately() {
        let scope = Scope::new("S");
        let released = Rc::new(Cell::new(0));
        let r = Rc::clone(&released);
        let inner = scope.clone();

        bind(&scope, move |live| {
            inner.deactivate();
            assert!(!live.is_active());
            Cleanup::new(move || r.set(r.get() + 1))
        });
        scope.activate().unwrap();

        assert_eq!(released.get(), 1);
    }
}
