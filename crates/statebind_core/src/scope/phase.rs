use crate::error::{CoreError, Result};

/// Binding phases shared by a scope and every binding registered against it.
///
/// `Uninitialized -> Active -> Disposed`, each entered at most once.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Uninitialized,
    Active,
    Disposed,
}

/// Requests that move a scope between phases.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Transition {
    Activate,
    Deactivate,
}

/// Internal, compact IDs used for error payloads.
impl Phase {
    pub const fn id(self) -> u8 {
        match self {
            Phase::Uninitialized => 0,
            Phase::Active => 1,
            Phase::Disposed => 2,
        }
    }

    /// True once resources may no longer be acquired.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Disposed)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Phase::Uninitialized => "Uninitialized",
            Phase::Active => "Active",
            Phase::Disposed => "Disposed",
        }
    }
}

impl Transition {
    pub const fn id(self) -> u8 {
        match self {
            Transition::Activate => 1,
            Transition::Deactivate => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Transition::Activate => "activate",
            Transition::Deactivate => "deactivate",
        }
    }
}

/// Canonical list of all phases.
pub const ALL_PHASES: [Phase; 3] = [Phase::Uninitialized, Phase::Active, Phase::Disposed];

/// Apply a transition to a phase.
///
/// Deactivation is accepted from `Uninitialized` as well: a scope torn down
/// before it ever activated still releases whatever its bindings registered.
/// Re-activation after `Disposed` is rejected; a new scope must be created.
pub fn next(current: Phase, via: Transition) -> Result<Phase> {
    use Phase::*;
    use Transition::*;

    let next = match (current, via) {
        (Uninitialized, Activate) => Active,
        (Uninitialized, Deactivate) | (Active, Deactivate) => Disposed,
        _ => return Err(CoreError::invalid_phase(current.id(), via.id())),
    };

    Ok(next)
}

/// Transitions accepted from a phase.
pub fn available_transitions(phase: Phase) -> &'static [Transition] {
    use Phase::*;
    use Transition::*;

    match phase {
        Uninitialized => &[Activate, Deactivate],
        Active => &[Deactivate],
        Disposed => &[],
    }
}
