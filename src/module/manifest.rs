//! Manifest-driven module discovery
//!
//! Scans a modules directory for `module.toml` manifests and turns each
//! into a declared feature-flag module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::provider::{LoadResult, ModuleProvider};
use crate::module::traits::{DynamicModule, ModuleError};

/// Module manifest (`module.toml` structure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module name (unique identifier).
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Modules this one must never be enabled alongside.
    #[serde(default)]
    pub incompatible_with: Vec<String>,
}

impl ModuleManifest {
    /// Load a manifest from file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::InvalidManifest(format!("failed to read manifest file: {}", e))
        })?;

        let manifest: ModuleManifest = toml::from_str(&contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("failed to parse manifest TOML: {}", e))
        })?;

        if manifest.name.is_empty() {
            return Err(ModuleError::InvalidManifest(
                "module name cannot be empty".to_string(),
            ));
        }

        Ok(manifest)
    }
}

/// In-process feature-flag module built from a manifest.
///
/// Carries the declared identity and incompatibility set; enabling and
/// disabling toggle its flag. Hosts with richer modules implement
/// [`DynamicModule`] themselves and supply their own provider.
pub struct DeclaredModule {
    name: String,
    incompatible_with: Vec<String>,
    enabled: bool,
}

impl DeclaredModule {
    pub fn new(name: impl Into<String>, incompatible_with: Vec<String>) -> Self {
        Self {
            name: name.into(),
            incompatible_with,
            enabled: false,
        }
    }

    pub fn from_manifest(manifest: ModuleManifest) -> Self {
        Self::new(manifest.name, manifest.incompatible_with)
    }
}

#[async_trait]
impl DynamicModule for DeclaredModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn incompatible_with(&self) -> &[String] {
        &self.incompatible_with
    }

    async fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        true
    }

    async fn disable(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        true
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn unload(&mut self) {
        self.enabled = false;
    }
}

/// Discovers modules by scanning `<modules_dir>/<name>/module.toml`.
pub struct ManifestProvider {
    modules_dir: PathBuf,
}

impl ManifestProvider {
    pub fn new<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
        }
    }
}

impl ModuleProvider for ManifestProvider {
    fn list_modules(&mut self) -> Vec<LoadResult> {
        info!("Scanning for module manifests in {:?}", self.modules_dir);

        if !self.modules_dir.exists() {
            debug!("Modules directory {:?} does not exist", self.modules_dir);
            return Vec::new();
        }

        let entries = match fs::read_dir(&self.modules_dir) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(ModuleError::LoadFailed {
                    origin: self.modules_dir.display().to_string(),
                    reason: format!("failed to read modules directory: {}", e),
                })]
            }
        };

        // Directory iteration order is platform-dependent; sort so discovery
        // order, and therefore replay order, is stable.
        let mut directories: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        directories.sort();

        let mut results = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for directory in directories {
            let manifest_path = directory.join("module.toml");
            if !manifest_path.exists() {
                debug!("No module.toml in {:?}, skipping", directory);
                continue;
            }

            match ModuleManifest::from_file(&manifest_path) {
                Ok(manifest) => {
                    if !seen.insert(manifest.name.clone()) {
                        warn!(
                            "Duplicate module name {} in {:?}",
                            manifest.name, manifest_path
                        );
                        results.push(Err(ModuleError::LoadFailed {
                            origin: manifest_path.display().to_string(),
                            reason: format!("duplicate module name: {}", manifest.name),
                        }));
                        continue;
                    }
                    debug!("Discovered module manifest: {}", manifest.name);
                    results.push(Ok(
                        Box::new(DeclaredModule::from_manifest(manifest)) as Box<dyn DynamicModule>
                    ));
                }
                Err(error) => {
                    warn!("Failed to load manifest in {:?}: {}", directory, error);
                    results.push(Err(ModuleError::LoadFailed {
                        origin: manifest_path.display().to_string(),
                        reason: error.to_string(),
                    }));
                }
            }
        }

        results
    }
}
