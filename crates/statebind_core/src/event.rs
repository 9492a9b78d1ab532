//! Process-event descriptors.
//!
//! A descriptor is what trigger and timer callbacks return to request a
//! dispatch. Three shapes are accepted and collapsed by `normalize()` into an
//! `Event`. A descriptor without a usable key is "no event", not an error.

use serde_json::{Map, Value};

/// Event request as produced by user callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDescriptor {
    /// Bare event key.
    Key(String),
    /// Event key plus data merged into the store before dispatch.
    Pair(String, Map<String, Value>),
    /// Record with optional key and data.
    Record {
        key: Option<String>,
        data: Option<Map<String, Value>>,
    },
}

fn key_of(value: Value) -> Option<String> {
    match value {
        Value::String(key) => Some(key),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalized event: what actually reaches the store and the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub key: String,
    pub data: Option<Map<String, Value>>,
}

impl EventDescriptor {
    pub fn key(key: impl Into<String>) -> Self {
        EventDescriptor::Key(key.into())
    }

    pub fn with_data(key: impl Into<String>, data: Map<String, Value>) -> Self {
        EventDescriptor::Pair(key.into(), data)
    }

    /// Parse a dynamically shaped descriptor.
    ///
    /// - string: the key
    /// - array: `[key, data]`
    /// - object: `{ "key": ..., "data": ... }`
    ///
    /// Inside an array or object the key may also be a non-zero number, which
    /// is stringified (`{"key": 5}` names event `"5"`). Anything else, or a
    /// malformed key/data slot, yields no key.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(key) => Some(EventDescriptor::Key(key)),
            Value::Array(items) => {
                let mut items = items.into_iter();
                let key = key_of(items.next()?)?;
                match items.next() {
                    Some(Value::Object(data)) => Some(EventDescriptor::Pair(key, data)),
                    None | Some(Value::Null) => Some(EventDescriptor::Key(key)),
                    Some(_) => None,
                }
            }
            Value::Object(mut record) => {
                let key = record.remove("key").and_then(key_of);
                let data = match record.remove("data") {
                    Some(Value::Object(data)) => Some(data),
                    _ => None,
                };
                Some(EventDescriptor::Record { key, data })
            }
            _ => None,
        }
    }

    /// Collapse any descriptor shape into an `Event`.
    ///
    /// Returns `None` when no non-empty key can be resolved.
    pub fn normalize(self) -> Option<Event> {
        let (key, data) = match self {
            EventDescriptor::Key(key) => (Some(key), None),
            EventDescriptor::Pair(key, data) => (Some(key), Some(data)),
            EventDescriptor::Record { key, data } => (key, data),
        };
        let key = key.filter(|k| !k.is_empty())?;
        Some(Event { key, data })
    }
}

impl From<&str> for EventDescriptor {
    fn from(key: &str) -> Self {
        EventDescriptor::Key(key.to_string())
    }
}

impl From<String> for EventDescriptor {
    fn from(key: String) -> Self {
        EventDescriptor::Key(key)
    }
}

impl From<(&str, Map<String, Value>)> for EventDescriptor {
    fn from((key, data): (&str, Map<String, Value>)) -> Self {
        EventDescriptor::Pair(key.to_string(), data)
    }
}

impl From<(String, Map<String, Value>)> for EventDescriptor {
    fn from((key, data): (String, Map<String, Value>)) -> Self {
        EventDescriptor::Pair(key, data)
    }
}

impl From<Event> for EventDescriptor {
    fn from(event: Event) -> Self {
        EventDescriptor::Record {
            key: Some(event.key),
            data: event.data,
        }
    }
}
