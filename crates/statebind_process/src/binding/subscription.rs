use std::rc::Rc;

use serde_json::Value;
use statebind_core::cleanup::Cleanup;
use statebind_core::error::Result;
use statebind_core::fields::Fields;
use statebind_core::scope::Scope;
use statebind_core::store::Store;
use tracing::trace;

use super::bind;
use crate::StateContext;

impl StateContext {
    /// Subscribe to `fields` for the lifetime of this state.
    ///
    /// On activation the store delivers the current value right away, so
    /// `on_change` first sees `(current, None)`; every later write touching
    /// the fields calls it with the value it saw last as `previous`.
    pub fn with_data<F>(&self, fields: impl Into<Fields>, on_change: F) -> Result<Cleanup>
    where
        F: FnMut(&Value, Option<&Value>) + 'static,
    {
        let store = self.process().store()?;
        Ok(subscribe_scoped(self.scope(), store, fields.into(), on_change))
    }
}

fn subscribe_scoped<F>(scope: &Scope, store: Rc<dyn Store>, fields: Fields, on_change: F) -> Cleanup
where
    F: FnMut(&Value, Option<&Value>) + 'static,
{
    let scope_key = scope.key().to_string();
    bind(scope, move |live| {
        trace!(scope = %scope_key, fields = ?fields.names(), "subscribing");
        let mut on_change = on_change;
        let mut previous: Option<Value> = None;
        store.subscribe(
            &fields,
            Box::new(move |current| {
                if !live.is_active() {
                    return;
                }
                on_change(&current, previous.as_ref());
                previous = Some(current);
            }),
        )
    })
}
