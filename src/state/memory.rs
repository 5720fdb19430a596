//! In-memory state store

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{StateError, StateStore};

#[derive(Default)]
struct Inner {
    values: HashMap<String, bool>,
    fail_next_save: bool,
}

/// State store with no durable backing, for tests and embedding.
///
/// Clones share one underlying map, so a test can keep a handle to the
/// store it moved into a registry and observe or poke it from outside.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `save` call fail, to exercise persistence-failure
    /// handling.
    pub fn fail_next_save(&self) {
        self.inner.lock().expect("state lock poisoned").fail_next_save = true;
    }

    /// Copy of the current key set.
    pub fn snapshot(&self) -> HashMap<String, bool> {
        self.inner.lock().expect("state lock poisoned").values.clone()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str, default: bool) -> bool {
        self.inner
            .lock()
            .expect("state lock poisoned")
            .values
            .get(key)
            .copied()
            .unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: bool) {
        self.inner
            .lock()
            .expect("state lock poisoned")
            .values
            .insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), StateError> {
        let mut inner = self.inner.lock().expect("state lock poisoned");
        if inner.fail_next_save {
            inner.fail_next_save = false;
            return Err(StateError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected save failure",
            )));
        }
        Ok(())
    }
}
