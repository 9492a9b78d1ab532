//! Timer contract: an injectable start/stop pair.

use std::time::Duration;

/// Identifier handed out by `TimerDriver::start`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TimerId(pub u64);

pub type TimerCallback = Box<dyn FnOnce()>;

pub trait TimerDriver {
    /// Run `callback` once after `delay`.
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerId;

    /// Cancel a timer. Unknown, fired or already stopped ids are a no-op.
    fn stop(&self, id: TimerId);
}
