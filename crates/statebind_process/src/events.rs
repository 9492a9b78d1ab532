//! Dispatched-event records.
//!
//! Emitted on the process broadcast channel after a binding hands an event to
//! the dispatcher. Lagging or absent receivers never block dispatch.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedEvent {
    pub key: String,
    /// Data written to the store right before dispatch.
    pub data: Option<Map<String, Value>>,
    /// Key of the state whose binding dispatched, when known.
    pub scope: Option<String>,
}
