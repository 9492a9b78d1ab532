//! Dispatch contract: hands an event key to the process engine.
//!
//! The engine may synchronously deactivate scopes (including the caller's)
//! before `dispatch` returns.

pub trait Dispatcher {
    fn dispatch(&self, key: &str);
}

impl<F> Dispatcher for F
where
    F: Fn(&str),
{
    fn dispatch(&self, key: &str) {
        self(key)
    }
}
