//! Service registry contract.
//!
//! Providers contribute values under a key; consumers of that key see the
//! aggregated list of live contributions. Aggregation belongs to the registry.

use std::any::Any;
use std::rc::Rc;

use crate::cleanup::Cleanup;

/// Opaque service contribution. Consumers downcast.
pub type Service = Rc<dyn Any>;

pub type ServiceListCallback = Box<dyn FnMut(&[Service])>;

pub trait ServiceRegistry {
    /// Contribute `service` under `key` until the returned handle is run.
    fn new_provider(&self, key: &str, service: Service) -> Cleanup;

    /// Observe the contributions under `key`.
    ///
    /// The callback receives the current list immediately, then again after
    /// every provider registration or withdrawal under that key.
    fn new_consumer(&self, key: &str, consumer: ServiceListCallback) -> Cleanup;
}

/// Collect the contributions of one concrete type, in registration order.
pub fn downcast_list<T: Clone + 'static>(services: &[Service]) -> Vec<T> {
    services
        .iter()
        .filter_map(|s| s.downcast_ref::<T>().cloned())
        .collect()
}
