//! Persisted desired-state store
//!
//! Durable key to boolean mapping behind a narrow seam. The registry buffers
//! writes with [`StateStore::set`] and flushes with [`StateStore::save`]
//! after every mutating batch; an absent key reads as the caller's default.

mod file;
mod memory;

pub use file::JsonStateStore;
pub use memory::MemoryStateStore;

use thiserror::Error;

/// State store failures.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable key to boolean mapping.
pub trait StateStore: Send {
    /// Read a key; `default` stands in for an absent key.
    fn get(&self, key: &str, default: bool) -> bool;

    /// Buffer a write. Durable only after [`save`](StateStore::save).
    fn set(&mut self, key: &str, value: bool);

    /// Flush buffered writes to durable storage.
    fn save(&mut self) -> Result<(), StateError>;
}
