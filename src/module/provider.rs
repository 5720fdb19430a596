//! Discovery collaborator seam
//!
//! The registry never locates modules itself; a provider hands it a finite
//! list at startup. Discovery mechanics stay swappable and testable with
//! fakes.

use crate::module::traits::{DynamicModule, ModuleError};

/// One discovery result: a loaded module, or a per-item failure.
pub type LoadResult = Result<Box<dyn DynamicModule>, ModuleError>;

/// Source of module implementations, consulted once at startup.
///
/// A broken module must never abort the whole listing: implementations
/// report per-item failures as `Err` entries and keep going.
pub trait ModuleProvider: Send {
    fn list_modules(&mut self) -> Vec<LoadResult>;
}

/// Hands the registry a pre-built module list.
///
/// For embedders that construct modules in code, and for tests. The list is
/// yielded once; a later discovery call sees nothing new.
pub struct StaticProvider {
    modules: Vec<LoadResult>,
}

impl StaticProvider {
    pub fn new(modules: Vec<LoadResult>) -> Self {
        Self { modules }
    }
}

impl ModuleProvider for StaticProvider {
    fn list_modules(&mut self) -> Vec<LoadResult> {
        std::mem::take(&mut self.modules)
    }
}
