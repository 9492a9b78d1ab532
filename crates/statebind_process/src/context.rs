use statebind_core::error::Result;
use statebind_core::scope::Scope;

use crate::error::log_core_error;
use crate::Process;

/// Binding surface of one state instance.
///
/// Pairs the shared `Process` with the state's `Scope`. Binding methods live
/// next to their components (see `binding::*`); each one checks its
/// collaborators synchronously and registers an acquire/release hook pair on
/// the scope.
#[derive(Clone, Debug)]
pub struct StateContext {
    process: Process,
    scope: Scope,
}

impl StateContext {
    pub fn new(process: Process, scope: Scope) -> Self {
        Self { process, scope }
    }

    /// Key of the current state.
    pub fn key(&self) -> &str {
        self.scope.key()
    }

    pub fn process(&self) -> &Process {
        &self.process
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Engine entry point: enter the state and run its activation hooks.
    ///
    /// A rejected activation (the scope was already used) is logged and returned.
    pub fn activate(&self) -> Result<()> {
        self.scope.activate().inspect_err(log_core_error)
    }

    /// Engine entry point: leave the state and release everything its bindings hold.
    pub fn deactivate(&self) {
        self.scope.deactivate();
    }
}
