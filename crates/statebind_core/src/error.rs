use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Convenient result alias for statebind.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Log/handling importance. Maps onto tracing levels in the process crate.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Where an error came from (helps triage and routing).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Domain {
    Lifecycle,
    Store,
    Services,
    Timer,
    Config,
    Other,
}

/// Stable error "kind" for matching/branching.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    InvalidState,
    NotInitialized,
    AlreadyInitialized,
    Other,
}

/// Optional structured payload for rich context without forcing allocation.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,

    /// Generic key/value context (usually no heap alloc if using &str).
    Context {
        key: &'static str,
        value: Cow<'static, str>,
    },

    /// Scope phase context: the phase a binding was in and the transition it attempted.
    ScopePhase { from_phase: u8, via_transition: u8 },
}

/// The one error type that crosses module boundaries in statebind.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("{severity:?}: {message}")]
pub struct CoreError {
    pub domain: Domain,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: Cow<'static, str>,
    pub payload: Payload,
}

impl CoreError {
    /// Fully-specified constructor (rarely needed at call sites).
    pub fn new(
        domain: Domain,
        kind: ErrorKind,
        severity: Severity,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            domain,
            kind,
            severity,
            message: message.into(),
            payload: Payload::None,
        }
    }

    // ---------------- Fluent entry points ----------------

    #[inline]
    pub fn trace() -> ErrB {
        ErrB::new(Severity::Trace)
    }
    #[inline]
    pub fn debug() -> ErrB {
        ErrB::new(Severity::Debug)
    }
    #[inline]
    pub fn info() -> ErrB {
        ErrB::new(Severity::Info)
    }
    #[inline]
    pub fn warn() -> ErrB {
        ErrB::new(Severity::Warn)
    }
    #[inline]
    pub fn error() -> ErrB {
        ErrB::new(Severity::Error)
    }
    #[inline]
    pub fn fatal() -> ErrB {
        ErrB::new(Severity::Fatal)
    }

    /// A binding was used before the collaborator it needs was attached to the process.
    ///
    /// `what` names the missing initializer (e.g. "store", "services").
    pub fn not_initialized(domain: Domain, what: &'static str) -> Self {
        CoreError::fatal()
            .domain(domain)
            .kind(ErrorKind::NotInitialized)
            .msgf(format_args!(
                "process {what} is not initialized; attach it before binding"
            ))
            .payload(Payload::Context {
                key: "missing",
                value: Cow::Borrowed(what),
            })
            .build()
    }

    /// A process slot that accepts exactly one collaborator was filled twice.
    pub fn already_initialized(domain: Domain, what: &'static str) -> Self {
        CoreError::error()
            .domain(domain)
            .kind(ErrorKind::AlreadyInitialized)
            .msgf(format_args!("process {what} is already attached"))
            .payload(Payload::Context {
                key: "slot",
                value: Cow::Borrowed(what),
            })
            .build()
    }

    /// Construct a lifecycle InvalidState error with the offending phase transition.
    pub fn invalid_phase(from_phase: u8, via_transition: u8) -> Self {
        CoreError::warn()
            .domain(Domain::Lifecycle)
            .kind(ErrorKind::InvalidState)
            .msg("invalid scope phase transition")
            .payload(Payload::ScopePhase {
                from_phase,
                via_transition,
            })
            .build()
    }
}

/// Fluent builder that behaves like iterator chains (takes self, returns Self).
/// Defaults:
/// - domain = Other
/// - kind = Other
/// - message = ""
/// - payload = None
#[derive(Debug, Clone)]
pub struct ErrB {
    domain: Domain,
    kind: ErrorKind,
    severity: Severity,
    message: Cow<'static, str>,
    payload: Payload,
}

impl ErrB {
    #[inline]
    fn new(severity: Severity) -> Self {
        Self {
            domain: Domain::Other,
            kind: ErrorKind::Other,
            severity,
            message: Cow::Borrowed(""),
            payload: Payload::None,
        }
    }

    /// Set/override the domain (defaults to Domain::Other).
    #[inline]
    pub fn domain(mut self, d: Domain) -> Self {
        self.domain = d;
        self
    }

    /// Set/override the kind (defaults to ErrorKind::Other).
    #[inline]
    pub fn kind(mut self, k: ErrorKind) -> Self {
        self.kind = k;
        self
    }

    #[inline]
    pub fn msg(mut self, m: impl Into<Cow<'static, str>>) -> Self {
        self.message = m.into();
        self
    }

    /// Formatting-friendly message setter.
    #[inline]
    pub fn msgf(mut self, args: fmt::Arguments<'_>) -> Self {
        self.message = Cow::Owned(args.to_string());
        self
    }

    /// Only one payload: this replaces any previous payload (default is None).
    #[inline]
    pub fn payload(mut self, p: Payload) -> Self {
        self.payload = p;
        self
    }

    #[inline]
    pub fn build(self) -> CoreError {
        CoreError {
            domain: self.domain,
            kind: self.kind,
            severity: self.severity,
            message: self.message,
            payload: self.payload,
        }
    }
}

impl From<ErrB> for CoreError {
    fn from(b: ErrB) -> Self {
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_names_the_missing_slot() {
        let e = CoreError::not_initialized(Domain::Store, "store");
        assert_eq!(e.kind, ErrorKind::NotInitialized);
        assert_eq!(e.domain, Domain::Store);
        assert_eq!(e.severity, Severity::Fatal);
        assert!(e.to_string().contains("store is not initialized"));

        match e.payload {
            Payload::Context { key, value } => {
                assert_eq!(key, "missing");
                assert_eq!(value, "store");
            }
            _ => panic!("expected Context payload"),
        }
    }

    #[test]
    fn constructors_pick_domain_kind_and_severity() {
        let cases = [
            (
                CoreError::not_initialized(Domain::Timer, "timer"),
                Domain::Timer,
                ErrorKind::NotInitialized,
                Severity::Fatal,
            ),
            (
                CoreError::already_initialized(Domain::Services, "services"),
                Domain::Services,
                ErrorKind::AlreadyInitialized,
                Severity::Error,
            ),
            (
                CoreError::invalid_phase(2, 0),
                Domain::Lifecycle,
                ErrorKind::InvalidState,
                Severity::Warn,
            ),
        ];
        for (e, domain, kind, severity) in cases {
            assert_eq!((e.domain, e.kind, e.severity), (domain, kind, severity), "{e}");
        }
    }

    #[test]
    fn builder_defaults_to_other() {
        let e: CoreError = CoreError::info().msg("plain").into();
        assert_eq!(e.domain, Domain::Other);
        assert_eq!(e.kind, ErrorKind::Other);
        assert_eq!(e.payload, Payload::None);
        assert_eq!(e.to_string(), "Info: plain");
    }
}
