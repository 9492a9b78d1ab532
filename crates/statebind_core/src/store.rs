//! Store contract.
//!
//! The store's reactivity engine is an external collaborator: statebind only
//! relies on the operations below. `statebind_process::MemoryStore` is the
//! in-process reference implementation.

use serde_json::{Map, Value};

use crate::cleanup::Cleanup;
use crate::fields::{Fields, WriteTarget};

/// Change callback: receives the current value of the subscribed fields,
/// shaped by `Fields::shape` (scalar for one field, record for many).
pub type ChangeCallback = Box<dyn FnMut(Value)>;

/// Shared key/value store.
///
/// Contract:
/// - unknown fields read as `Null`; writes create the field
/// - `subscribe` delivers the current value synchronously before returning,
///   then once per write touching any subscribed field (one delivery per
///   `set_all` batch), with no deduplication by value
/// - deliveries to one subscriber never overlap
/// - the returned `Cleanup` ends the subscription; nothing is delivered after
pub trait Store {
    fn get(&self, name: &str) -> Value;

    fn get_all(&self, names: &[String]) -> Map<String, Value>;

    fn set(&self, name: &str, value: Value);

    /// Apply all assignments, then notify each affected subscriber once.
    fn set_all(&self, assignments: Vec<(String, Value)>);

    fn subscribe(&self, fields: &Fields, callback: ChangeCallback) -> Cleanup;

    /// Read through the shared field-shape normalization.
    fn read(&self, fields: &Fields) -> Value {
        match fields {
            Fields::One(name) => self.get(name),
            Fields::Many(names) => Value::Object(self.get_all(names)),
        }
    }

    /// Write through the shared field-shape normalization.
    fn write(&self, target: WriteTarget, value: Value) {
        match target {
            WriteTarget::Fields(Fields::One(name)) => self.set(&name, value),
            target => self.set_all(target.assignments(value)),
        }
    }
}
