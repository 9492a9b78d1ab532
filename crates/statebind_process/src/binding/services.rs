use statebind_core::cleanup::Cleanup;
use statebind_core::error::Result;
use statebind_core::services::Service;
use tracing::trace;

use super::bind;
use crate::StateContext;

impl StateContext {
    /// Contribute `service` under `key` while this state is active.
    pub fn provide_service(&self, key: impl Into<String>, service: Service) -> Result<Cleanup> {
        let registry = self.process().services()?;
        let key = key.into();
        let scope_key = self.key().to_string();

        Ok(bind(self.scope(), move |_| {
            trace!(scope = %scope_key, service = %key, "providing");
            registry.new_provider(&key, service)
        }))
    }

    /// Receive the contributions under `key` while this state is active.
    ///
    /// `on_list` gets the current list on activation, then the full list
    /// again after every change.
    pub fn consume_services<F>(&self, key: impl Into<String>, mut on_list: F) -> Result<Cleanup>
    where
        F: FnMut(&[Service]) + 'static,
    {
        let registry = self.process().services()?;
        let key = key.into();
        let scope_key = self.key().to_string();

        Ok(bind(self.scope(), move |live| {
            trace!(scope = %scope_key, service = %key, "consuming");
            registry.new_consumer(
                &key,
                Box::new(move |services: &[Service]| {
                    if live.is_active() {
                        on_list(services);
                    }
                }),
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use statebind_core::error::ErrorKind;
    use statebind_core::services::downcast_list;

    use crate::{MemoryServices, Process, ProcessConfig, Scope};

    fn process_with(services: &MemoryServices) -> Process {
        Process::with_config(
            "p",
            ProcessConfig::default().services(Rc::new(services.clone())),
        )
    }

    #[test]
    fn provider_lives_with_its_state() {
        let services = MemoryServices::new();
        let process = process_with(&services);
        let ctx = process.state(Scope::new("S"));

        ctx.provide_service("greeting", Rc::new("hello")).unwrap();
        assert_eq!(services.provider_count("greeting"), 0);

        ctx.activate().unwrap();
        assert_eq!(services.provider_count("greeting"), 1);

        ctx.deactivate();
        assert_eq!(services.provider_count("greeting"), 0);
    }

    #[test]
    fn consumer_sees_every_list_change() {
        let services = MemoryServices::new();
        let process = process_with(&services);
        let lists = Rc::new(RefCell::new(Vec::new()));

        let consumer = process.state(Scope::new("Consumer"));
        let l = Rc::clone(&lists);
        consumer
            .consume_services("plugin", move |list| {
                l.borrow_mut().push(downcast_list::<&'static str>(list))
            })
            .unwrap();
        consumer.activate().unwrap();

        let a = process.state(Scope::new("A"));
        a.provide_service("plugin", Rc::new("a")).unwrap();
        a.activate().unwrap();

        let b = process.state(Scope::new("B"));
        b.provide_service("plugin", Rc::new("b")).unwrap();
        b.activate().unwrap();

        a.deactivate();
        consumer.deactivate();
        b.deactivate();

        assert_eq!(
            *lists.borrow(),
            vec![vec![], vec!["a"], vec!["a", "b"], vec!["b"]]
        );
        assert_eq!(services.consumer_count("plugin"), 0);
    }

    #[test]
    fn requires_a_registry() {
        let process = Process::new("p");
        let ctx = process.state(Scope::new("S"));
        let e = ctx.provide_service("x", Rc::new(1_u8)).unwrap_err();
        assert_eq!(e.kind, ErrorKind::NotInitialized);
        let e = ctx.consume_services("x", |_| {}).unwrap_err();
        assert_eq!(e.kind, ErrorKind::NotInitialized);
    }
}
