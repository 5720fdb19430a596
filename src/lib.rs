//! dynmod - runtime manager for dynamically enabled feature modules
//!
//! This crate provides a registry of independently-authored feature modules
//! that an operator enables and disables by name. Each module declares the
//! set of peer modules it cannot run alongside; enabling a module first
//! disables any enabled peer related to it by such a declaration. Every
//! successful transition is persisted, and the persisted state is replayed
//! at startup so the previously-active set is restored on the next run.
//!
//! ## Architecture
//!
//! - **Registry Core**: [`module::ModuleRegistry`] owns the module table and
//!   mediates every state transition so the incompatibility invariant holds
//! - **Conflict Resolution**: a pure policy computes which enabled modules a
//!   target displaces before it is enabled
//! - **Pluggable Discovery**: modules arrive through the
//!   [`module::ModuleProvider`] seam; a manifest-driven provider ships in
//!   the crate, fakes slot in for tests
//! - **Durable State**: desired state lives behind the [`state::StateStore`]
//!   seam, one boolean per module name, flushed after every mutating batch
//! - **Event Projection**: the registry reports lifecycle events through an
//!   [`module::EventSink`]; sinks render, they never mutate

pub mod config;
pub mod module;
pub mod state;

pub use config::ManagerConfig;
pub use module::{
    DynamicModule, EventSink, ModuleError, ModuleEvent, ModuleProvider, ModuleRegistry,
};
pub use state::{JsonStateStore, MemoryStateStore, StateError, StateStore};
