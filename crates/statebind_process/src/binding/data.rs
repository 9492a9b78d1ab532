use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use statebind_core::error::Result;
use statebind_core::fields::{Fields, WriteTarget};
use statebind_core::store::Store;

use crate::StateContext;

/// Getter/setter pair bound to one normalized field shape.
#[derive(Clone)]
pub struct DataHandle {
    store: Rc<dyn Store>,
    fields: Fields,
}

impl DataHandle {
    pub(crate) fn new(store: Rc<dyn Store>, fields: Fields) -> Self {
        Self { store, fields }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Scalar for one field, record for many.
    pub fn get(&self) -> Value {
        self.store.read(&self.fields)
    }

    pub fn set(&self, value: Value) {
        self.store
            .write(WriteTarget::Fields(self.fields.clone()), value);
    }
}

impl fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataHandle")
            .field("fields", &self.fields)
            .finish()
    }
}

/// Data access. Not scoped: reads and writes happen immediately.
impl StateContext {
    pub fn get_data(&self, fields: impl Into<Fields>) -> Result<Value> {
        self.process().get_data(fields)
    }

    /// `target` is a field, a list of fields, or a map (then `value` is ignored).
    pub fn set_data(&self, target: impl Into<WriteTarget>, value: Value) -> Result<()> {
        self.process().set_data(target, value)
    }

    pub fn use_data(&self, fields: impl Into<Fields>) -> Result<DataHandle> {
        self.process().use_data(fields)
    }
}
