//! Test-only stand-ins for the collaborators a host application provides:
//! a hierarchical process engine and a manually driven clock.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::{Rc, Weak};
use std::time::Duration;

use statebind_core::timer::{TimerCallback, TimerDriver, TimerId};
use statebind_process::{Process, Scope, StateContext};

type Setup = Box<dyn Fn(&StateContext)>;

struct StateDef {
    parent: Option<&'static str>,
    initial: Option<&'static str>,
    setup: Option<Setup>,
}

/// Declares the state tree of a `Harness`.
#[derive(Default)]
pub struct HarnessBuilder {
    states: HashMap<&'static str, StateDef>,
    transitions: HashMap<(&'static str, &'static str), &'static str>,
}

impl HarnessBuilder {
    /// Declare `name` under `parent`; `setup` runs on every entry, before activation.
    pub fn state(
        mut self,
        name: &'static str,
        parent: Option<&'static str>,
        setup: impl Fn(&StateContext) + 'static,
    ) -> Self {
        self.states.insert(
            name,
            StateDef {
                parent,
                initial: None,
                setup: Some(Box::new(setup)),
            },
        );
        self
    }

    /// Declare `name` without bindings.
    pub fn plain(mut self, name: &'static str, parent: Option<&'static str>) -> Self {
        self.states.insert(
            name,
            StateDef {
                parent,
                initial: None,
                setup: None,
            },
        );
        self
    }

    /// Entering `parent` also enters `child`.
    pub fn initial(mut self, parent: &'static str, child: &'static str) -> Self {
        if let Some(def) = self.states.get_mut(parent) {
            def.initial = Some(child);
        }
        self
    }

    /// While `from` (or a descendant) is active, `event` moves to `to`.
    pub fn on(mut self, from: &'static str, event: &'static str, to: &'static str) -> Self {
        self.transitions.insert((from, event), to);
        self
    }

    /// Build the engine and attach it as the process dispatcher.
    pub fn build(self, process: &Process) -> Harness {
        let inner = Rc::new(HarnessInner {
            process: process.clone(),
            states: self.states,
            transitions: self.transitions,
            active: RefCell::new(Vec::new()),
            busy: Cell::new(false),
            queue: RefCell::new(VecDeque::new()),
            log: RefCell::new(Vec::new()),
        });

        let weak: Weak<HarnessInner> = Rc::downgrade(&inner);
        process
            .attach_dispatcher(Rc::new(move |key: &str| {
                if let Some(inner) = weak.upgrade() {
                    inner.dispatch(key);
                }
            }))
            .expect("dispatcher attached once");

        Harness { inner }
    }
}

struct HarnessInner {
    process: Process,
    states: HashMap<&'static str, StateDef>,
    transitions: HashMap<(&'static str, &'static str), &'static str>,
    active: RefCell<Vec<(&'static str, StateContext)>>,
    busy: Cell<bool>,
    queue: RefCell<VecDeque<String>>,
    log: RefCell<Vec<String>>,
}

impl HarnessInner {
    /// Events dispatched while a step is in progress run after it.
    fn dispatch(&self, key: &str) {
        self.queue.borrow_mut().push_back(key.to_string());
        self.run();
    }

    /// Drain the queue in FIFO order unless a step is already running.
    fn run(&self) {
        if self.busy.replace(true) {
            return;
        }
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(key) = next else {
                break;
            };
            self.step(&key);
        }
        self.busy.set(false);
    }

    fn step(&self, key: &str) {
        let active: Vec<&'static str> = self.active.borrow().iter().map(|(n, _)| *n).collect();
        let target = active
            .iter()
            .rev()
            .find_map(|state| {
                self.transitions
                    .iter()
                    .find(|((from, event), _)| from == state && *event == key)
                    .map(|(_, to)| *to)
            });
        match target {
            Some(target) => self.transition_to(target, key),
            None => self.log.borrow_mut().push(format!("ignored {key}")),
        }
    }

    fn path_to(&self, target: &'static str) -> Vec<&'static str> {
        let mut path = vec![target];
        let mut current = target;
        while let Some(parent) = self.states.get(current).and_then(|d| d.parent) {
            path.push(parent);
            current = parent;
        }
        path.reverse();

        let mut leaf = target;
        while let Some(child) = self.states.get(leaf).and_then(|d| d.initial) {
            path.push(child);
            leaf = child;
        }
        path
    }

    fn transition_to(&self, target: &'static str, event: &str) {
        let path = self.path_to(target);
        let target_depth = path.iter().position(|s| *s == target).unwrap_or(0);

        let keep = {
            let active = self.active.borrow();
            active
                .iter()
                .zip(&path)
                .take_while(|(entry, p)| entry.0 == **p)
                .count()
                .min(target_depth)
        };

        // Leaf first.
        loop {
            let popped = {
                let mut active = self.active.borrow_mut();
                if active.len() > keep {
                    active.pop()
                } else {
                    None
                }
            };
            let Some((name, ctx)) = popped else {
                break;
            };
            ctx.deactivate();
            self.log.borrow_mut().push(format!("exit {name}"));
        }

        for &name in &path[keep..] {
            let ctx = self.process.state(Scope::new(name));
            if let Some(setup) = self.states.get(name).and_then(|d| d.setup.as_ref()) {
                setup(&ctx);
            }
            self.active.borrow_mut().push((name, ctx.clone()));
            self.log.borrow_mut().push(format!("enter {name} ({event})"));
            ctx.activate().expect("fresh scope activates");
        }
    }

    fn stop(&self) {
        loop {
            let popped = self.active.borrow_mut().pop();
            let Some((name, ctx)) = popped else {
                break;
            };
            ctx.deactivate();
            self.log.borrow_mut().push(format!("exit {name}"));
        }
    }
}

/// Minimal hierarchical process engine.
///
/// Transitions are looked up from the innermost active state outwards.
/// Exiting tears states down leaf first; entering builds them root first,
/// each with a fresh `Scope`.
pub struct Harness {
    inner: Rc<HarnessInner>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Enter `state` (and its ancestors and initial children).
    pub fn start(&self, state: &'static str) {
        self.inner.busy.set(true);
        self.inner.transition_to(state, "start");
        self.inner.busy.set(false);
        self.inner.run();
    }

    pub fn send(&self, event: &str) {
        self.inner.dispatch(event);
    }

    /// Exit every active state.
    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn active(&self) -> Vec<&'static str> {
        self.inner.active.borrow().iter().map(|(n, _)| *n).collect()
    }

    pub fn context(&self, state: &str) -> Option<StateContext> {
        self.inner
            .active
            .borrow()
            .iter()
            .find(|(n, _)| *n == state)
            .map(|(_, ctx)| ctx.clone())
    }

    pub fn log(&self) -> Vec<String> {
        self.inner.log.borrow().clone()
    }
}

/// Deterministic `TimerDriver`: time only moves on `advance`.
#[derive(Default)]
pub struct ManualTimer {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    armed: RefCell<BTreeMap<(Duration, TimerId), TimerCallback>>,
}

impl ManualTimer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.armed.borrow().len()
    }

    /// Move the clock forward, firing due timers in deadline order.
    pub fn advance(&self, by: Duration) {
        let until = self.now.get() + by;
        loop {
            let due = {
                let mut armed = self.armed.borrow_mut();
                let key = armed
                    .first_key_value()
                    .map(|(k, _)| *k)
                    .filter(|(at, _)| *at <= until);
                key.and_then(|k| armed.remove(&k).map(|cb| (k.0, cb)))
            };
            let Some((at, callback)) = due else {
                break;
            };
            self.now.set(at);
            callback();
        }
        self.now.set(until);
    }
}

impl TimerDriver for ManualTimer {
    fn start(&self, delay: Duration, callback: TimerCallback) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.armed
            .borrow_mut()
            .insert((self.now.get() + delay, id), callback);
        id
    }

    fn stop(&self, id: TimerId) {
        self.armed.borrow_mut().retain(|(_, armed), _| *armed != id);
    }
}
