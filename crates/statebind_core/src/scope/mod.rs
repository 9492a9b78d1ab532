//! statebind_core::scope
//!
//! Scope lifecycle: the activation/deactivation hook pair exposed by one state
//! instance, plus the phase machine every binding follows.
//!
//! Key ideas:
//! - `Uninitialized -> Active -> Disposed`, no re-entry into `Active`
//! - activation hooks run in order, deactivation hooks unwind as a release stack
//! - teardown runs synchronously to completion, even when triggered reentrantly

mod lifecycle;
mod phase;

pub use lifecycle::Scope;
pub use phase::{available_transitions, next, Phase, Transition, ALL_PHASES};
