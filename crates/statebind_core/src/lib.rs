//! statebind_core: runtime-agnostic core for lifecycle-scoped state bindings.
//!
//! Design goals:
//! - Pure, testable logic (no async runtime).
//! - Explicit types; no macro wizardry.
//! - Collaborators (store, service registry, timer, dispatcher) are traits.

pub mod error;

/// Scope activation/deactivation hooks and the binding phase machine.
pub mod scope;

/// Field-shape normalization shared by every store access.
pub mod fields;

/// Event descriptors and their normalization.
pub mod event;

/// Cancel-before-ready latch for asynchronously acquired resources.
pub mod latch;

/// Non-overlapping, order-preserving callback delivery.
pub mod delivery;

/// Idempotent release handles.
pub mod cleanup;

/// Collaborator contracts.
pub mod dispatch;
pub mod services;
pub mod store;
pub mod timer;

pub use serde_json::{Map, Value};
