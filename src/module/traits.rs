//! Module contract and error taxonomy
//!
//! Defines the trait every feature module implements and the errors the
//! registry surfaces to callers.

use async_trait::async_trait;
use thiserror::Error;

use crate::state::StateError;

/// Contract between the registry and one feature module.
///
/// Modules are authored independently and only consumed through this trait.
/// The module is the sole authority on its own enabled flag; the registry
/// queries it rather than tracking a shadow copy, and mutates it only
/// through [`enable`](DynamicModule::enable) and
/// [`disable`](DynamicModule::disable).
#[async_trait]
pub trait DynamicModule: Send + Sync {
    /// Unique module name, stable across restarts; doubles as the
    /// persistence key.
    fn name(&self) -> &str;

    /// Names of modules this one must never be enabled alongside.
    ///
    /// Names with no registry entry are no-op references, not errors.
    fn incompatible_with(&self) -> &[String];

    /// Enable the module. Returns `true` if a transition happened, `false`
    /// if the module was already enabled.
    async fn enable(&mut self) -> bool;

    /// Disable the module. Returns `true` if a transition happened, `false`
    /// if the module was already disabled.
    async fn disable(&mut self) -> bool;

    /// Current enabled state.
    fn is_enabled(&self) -> bool;

    /// Called exactly once when the registry shuts down, whether or not the
    /// module is enabled.
    async fn unload(&mut self);
}

/// Errors surfaced by registry operations.
///
/// Nothing here is fatal to the hosting process; every failed operation
/// leaves the registry consistent and retryable.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("batch of {0} modules exceeds the batch limit")]
    BatchTooLarge(usize),

    #[error("failed to load module from {origin}: {reason}")]
    LoadFailed { origin: String, reason: String },

    #[error("invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("failed to persist module state: {0}")]
    Persistence(#[from] StateError),
}
