//! statebind_process
//!
//! Lifecycle-scoped bindings between a state-machine process, a shared
//! key/value store and a named-service registry.
//!
//! A `Process` holds the collaborators (attached once). Every activated state
//! gets a `StateContext`, whose binding methods register acquire/release hook
//! pairs on the state's `Scope`:
//! - data: `get_data`, `set_data`, `use_data`
//! - subscriptions: `with_data`
//! - observations: `observe_data`
//! - events: `dispatch_event`, `trigger`, `after_delay`, `timeout`
//! - services: `provide_service`, `consume_services`
//!
//! Everything here is single-threaded (`Rc`, `!Send`); async work runs on a
//! tokio `LocalSet`.

pub mod error;

mod config;
pub use config::{ProcessConfig, DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_TIMEOUT_EVENT};

mod process;
pub use process::Process;

mod context;
pub use context::StateContext;

// Per-component bindings (each adds methods to `StateContext`).
mod binding;
pub use binding::{DataHandle, Mapped, Observation};

// Dispatched-event stream (observability for dispatches made by bindings).
mod events;
pub use events::DispatchedEvent;

// In-process reference collaborators.
mod memory_services;
mod memory_store;
mod tokio_timer;
pub use memory_services::MemoryServices;
pub use memory_store::MemoryStore;
pub use tokio_timer::TokioTimer;

// Re-export core types that binding users will commonly need
pub use statebind_core::cleanup::Cleanup;
pub use statebind_core::error::{CoreError, Result};
pub use statebind_core::event::{Event, EventDescriptor};
pub use statebind_core::fields::{Fields, WriteTarget};
pub use statebind_core::scope::{Phase, Scope};
pub use statebind_core::services::{downcast_list, Service};
pub use statebind_core::{Map, Value};
