//! Configuration for the module manager
//!
//! Handles configuration loading and defaults for the manager binary and
//! for embedders that wire the registry themselves.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Module manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Directory scanned for module manifests.
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Path of the persisted module-state file.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_modules_dir() -> String {
    "modules".to_string()
}

fn default_state_file() -> String {
    "data/module_state.json".to_string()
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            modules_dir: "modules".to_string(),
            state_file: "data/module_state.json".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }
}
