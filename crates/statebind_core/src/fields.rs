//! Field-shape normalization.
//!
//! Every store access in statebind goes through these two types:
//! - `Fields` names what is read or subscribed (one field or a list)
//! - `WriteTarget` names what is written (fields, or a map of field -> value)

use serde_json::{Map, Value};

/// One field, or an ordered list of fields read as a record.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Fields {
    One(String),
    Many(Vec<String>),
}

impl Fields {
    /// Field names in declaration order.
    pub fn names(&self) -> &[String] {
        match self {
            Fields::One(name) => std::slice::from_ref(name),
            Fields::Many(names) => names,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }

    /// Shape raw field values into what a reader of these fields sees.
    ///
    /// `One` yields the scalar itself; `Many` yields an object keyed by field
    /// name. Unknown fields read as `Null`.
    pub fn shape<F>(&self, mut lookup: F) -> Value
    where
        F: FnMut(&str) -> Value,
    {
        match self {
            Fields::One(name) => lookup(name),
            Fields::Many(names) => {
                let record: Map<String, Value> = names
                    .iter()
                    .map(|name| (name.clone(), lookup(name)))
                    .collect();
                Value::Object(record)
            }
        }
    }
}

impl From<&str> for Fields {
    fn from(name: &str) -> Self {
        Fields::One(name.to_string())
    }
}

impl From<String> for Fields {
    fn from(name: String) -> Self {
        Fields::One(name)
    }
}

impl From<Vec<String>> for Fields {
    fn from(names: Vec<String>) -> Self {
        Fields::Many(names)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(names: Vec<&str>) -> Self {
        Fields::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Fields {
    fn from(names: &[&str]) -> Self {
        Fields::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(names: [&str; N]) -> Self {
        Fields::Many(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Destination of a write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteTarget {
    Fields(Fields),
    /// Keys and values both come from the map; the write's `value` is ignored.
    Map(Map<String, Value>),
}

impl WriteTarget {
    /// Resolve the write into ordered `(field, value)` assignments.
    ///
    /// - `One(name)`: the field receives `value`
    /// - `Many(names)`: when `value` is an object each name receives
    ///   `value[name]` (`Null` when absent), otherwise each name receives `value`
    /// - `Map(map)`: every entry of the map, `value` ignored
    pub fn assignments(self, value: Value) -> Vec<(String, Value)> {
        match self {
            WriteTarget::Fields(Fields::One(name)) => vec![(name, value)],
            WriteTarget::Fields(Fields::Many(names)) => match value {
                Value::Object(mut record) => names
                    .into_iter()
                    .map(|name| {
                        let v = record.remove(&name).unwrap_or(Value::Null);
                        (name, v)
                    })
                    .collect(),
                other => names
                    .into_iter()
                    .map(|name| (name, other.clone()))
                    .collect(),
            },
            WriteTarget::Map(map) => map.into_iter().collect(),
        }
    }
}

impl From<Fields> for WriteTarget {
    fn from(fields: Fields) -> Self {
        WriteTarget::Fields(fields)
    }
}

impl From<&str> for WriteTarget {
    fn from(name: &str) -> Self {
        WriteTarget::Fields(name.into())
    }
}

impl From<String> for WriteTarget {
    fn from(name: String) -> Self {
        WriteTarget::Fields(name.into())
    }
}

impl From<Vec<String>> for WriteTarget {
    fn from(names: Vec<String>) -> Self {
        WriteTarget::Fields(names.into())
    }
}

impl From<Vec<&str>> for WriteTarget {
    fn from(names: Vec<&str>) -> Self {
        WriteTarget::Fields(names.into())
    }
}

impl<const N: usize> From<[&str; N]> for WriteTarget {
    fn from(names: [&str; N]) -> Self {
        WriteTarget::Fields(names.into())
    }
}

impl From<Map<String, Value>> for WriteTarget {
    fn from(map: Map<String, Value>) -> Self {
        WriteTarget::Map(map)
    }
}
