use std::rc::Rc;
use std::time::Duration;

use statebind_core::cleanup::Cleanup;
use statebind_core::error::Result;
use statebind_core::event::EventDescriptor;
use tracing::trace;

use super::{bind, EventSink};
use crate::StateContext;

impl StateContext {
    /// Dispatch the event returned by `compute` once `delay` has passed, unless
    /// this state deactivates first.
    ///
    /// One timer per call, started on activation through the process timer
    /// driver and stopped on deactivation whether or not it fired. The driver
    /// is resolved here, so a process with neither an attached driver nor a
    /// tokio runtime fails with `Timer`/`NotInitialized` instead of at
    /// activation.
    pub fn after_delay<F>(&self, delay: Duration, compute: F) -> Result<Cleanup>
    where
        F: FnOnce() -> Option<EventDescriptor> + 'static,
    {
        let sink = EventSink::new(self)?;
        let timer = self.process().timer()?;
        let scope_key = self.key().to_string();

        Ok(bind(self.scope(), move |live| {
            let id = timer.start(
                delay,
                Box::new(move || {
                    if !live.is_active() {
                        return;
                    }
                    if let Some(descriptor) = compute() {
                        sink.dispatch(descriptor);
                    }
                }),
            );
            trace!(scope = %scope_key, timer = id.0, ?delay, "timer started");

            let stop = Rc::clone(&timer);
            Cleanup::new(move || stop.stop(id))
        }))
    }

    /// `after_delay` with the process's default timeout event.
    pub fn timeout(&self, delay: Duration) -> Result<Cleanup> {
        let key = self.process().timeout_event().to_string();
        self.after_delay(delay, move || Some(EventDescriptor::Key(key)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use statebind_core::error::{Domain, ErrorKind};
    use statebind_core::timer::{TimerCallback, TimerDriver, TimerId};

    use crate::{MemoryStore, Process, ProcessConfig, Scope};

    use super::*;

    /// Fires timers only when told to.
    #[derive(Default)]
    struct StepTimer {
        next: std::cell::Cell<u64>,
        armed: RefCell<Vec<(TimerId, TimerCallback)>>,
    }

    impl StepTimer {
        fn fire_all(&self) {
            let armed = std::mem::take(&mut *self.armed.borrow_mut());
            for (_, callback) in armed {
                callback();
            }
        }

        fn armed(&self) -> usize {
            self.armed.borrow().len()
        }
    }

    impl TimerDriver for StepTimer {
        fn start(&self, _delay: Duration, callback: TimerCallback) -> TimerId {
            let id = TimerId(self.next.get());
            self.next.set(id.0 + 1);
            self.armed.borrow_mut().push((id, callback));
            id
        }

        fn stop(&self, id: TimerId) {
            self.armed.borrow_mut().retain(|(armed, _)| *armed != id);
        }
    }

    fn setup() -> (Rc<StepTimer>, Process, Rc<RefCell<Vec<String>>>) {
        let timer = Rc::new(StepTimer::default());
        let process = Process::with_config(
            "p",
            ProcessConfig::default()
                .store(Rc::new(MemoryStore::new()))
                .timer(Rc::clone(&timer) as Rc<dyn TimerDriver>)
                .timeout_event("done"),
        );
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        process
            .attach_dispatcher(Rc::new(move |key: &str| sink.borrow_mut().push(key.to_string())))
            .unwrap();
        (timer, process, log)
    }

    #[test]
    fn timeout_dispatches_the_configured_key() {
        let (timer, process, log) = setup();
        let ctx = process.state(Scope::new("S"));

        ctx.timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(timer.armed(), 0);
        ctx.activate().unwrap();
        assert_eq!(timer.armed(), 1);

        timer.fire_all();
        assert_eq!(*log.borrow(), vec!["done"]);
    }

    #[test]
    fn deactivation_stops_the_timer() {
        let (timer, process, log) = setup();
        let ctx = process.state(Scope::new("S"));

        ctx.after_delay(Duration::from_millis(10), || Some("late".into()))
            .unwrap();
        ctx.activate().unwrap();
        ctx.deactivate();

        assert_eq!(timer.armed(), 0);
        timer.fire_all();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn compute_may_suppress_the_event() {
        let (timer, process, log) = setup();
        let ctx = process.state(Scope::new("S"));

        ctx.after_delay(Duration::ZERO, || None).unwrap();
        ctx.activate().unwrap();
        timer.fire_all();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stray_fire_after_dispose_is_ignored() {
        // A driver that ignores `stop` must still not reach the dispatcher.
        struct Deaf(RefCell<Vec<TimerCallback>>);
        impl TimerDriver for Deaf {
            fn start(&self, _: Duration, callback: TimerCallback) -> TimerId {
                self.0.borrow_mut().push(callback);
                TimerId(0)
            }
            fn stop(&self, _: TimerId) {}
        }

        let deaf = Rc::new(Deaf(RefCell::new(Vec::new())));
        let process = Process::with_config(
            "p",
            ProcessConfig::default()
                .store(Rc::new(MemoryStore::new()))
                .timer(Rc::clone(&deaf) as Rc<dyn TimerDriver>),
        );
        let fired = Rc::new(RefCell::new(0));
        let f = Rc::clone(&fired);
        process
            .attach_dispatcher(Rc::new(move |_: &str| *f.borrow_mut() += 1))
            .unwrap();
        let ctx = process.state(Scope::new("S"));

        ctx.timeout(Duration::ZERO).unwrap();
        ctx.activate().unwrap();
        ctx.deactivate();
        for callback in deaf.0.borrow_mut().drain(..) {
            callback();
        }

        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn timeout_without_a_runtime_needs_an_attached_driver() {
        let process = Process::with_config(
            "p",
            ProcessConfig::default().store(Rc::new(MemoryStore::new())),
        );
        process.attach_dispatcher(Rc::new(|_: &str| {})).unwrap();
        let ctx = process.state(Scope::new("S"));

        let e = ctx.timeout(Duration::from_millis(10)).unwrap_err();
        assert_eq!(e.domain, Domain::Timer);
        assert_eq!(e.kind, ErrorKind::NotInitialized);
        ctx.activate().unwrap();
        ctx.deactivate();
    }
}
