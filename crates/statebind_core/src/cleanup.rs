use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Release = Box<dyn FnOnce()>;

/// Idempotent release handle.
///
/// Wraps an unsubscribe, timer-clear or registry close. Clones share the same
/// release; only the first `run()` across all clones has an effect.
#[derive(Clone, Default)]
pub struct Cleanup {
    release: Rc<RefCell<Option<Release>>>,
}

impl Cleanup {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Rc::new(RefCell::new(Some(Box::new(release)))),
        }
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Release the resource. Later calls are no-ops.
    pub fn run(&self) {
        // Take first: the release may drop the last clone of this handle.
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.release.borrow().is_none()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("released", &self.is_released())
            .finish()
    }
}
