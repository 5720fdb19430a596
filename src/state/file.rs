//! File-backed state store

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{StateError, StateStore};

/// State store persisted as one JSON object of string keys to booleans.
pub struct JsonStateStore {
    path: PathBuf,
    values: BTreeMap<String, bool>,
}

impl JsonStateStore {
    /// Open the store, loading existing state if the file is present.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StateError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, values })
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, key: &str, default: bool) -> bool {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        // Write-then-rename: a failed write must not truncate the previous
        // state file.
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)?;
        debug!(
            "Persisted {} state entries to {:?}",
            self.values.len(),
            self.path
        );
        Ok(())
    }
}
