//! Module registry and state machine
//!
//! Owns the set of known modules and mediates every state transition.
//! All mutating operations serialize on a single mutex around the module
//! table and the state store, so a transition and its persistence write can
//! never interleave with another operation.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::module::conflict;
use crate::module::events::{EventSink, ModuleEvent};
use crate::module::provider::ModuleProvider;
use crate::module::traits::{DynamicModule, ModuleError};
use crate::state::StateStore;

/// Maximum number of names accepted by one [`ModuleRegistry::enable_set`]
/// batch.
pub const MAX_BATCH: usize = 3;

/// Namespaced persistence key for a module.
fn state_key(name: &str) -> String {
    format!("dynamics.{}", name)
}

/// Outcome of an enable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// The module transitioned to enabled.
    Enabled,
    /// The module was already enabled; nothing was persisted.
    AlreadyEnabled,
}

/// Outcome of a disable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableOutcome {
    /// The module transitioned to disabled.
    Disabled,
    /// The module was already disabled; nothing was persisted.
    AlreadyDisabled,
}

/// One row of a [`ModuleRegistry::status`] snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    pub name: String,
    pub enabled: bool,
}

/// Result of an [`ModuleRegistry::enable_set`] batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Names enabled (or found already enabled) by this batch, in order.
    pub enabled: Vec<String>,
    /// Names skipped because an earlier batch member declared them
    /// incompatible.
    pub skipped: Vec<String>,
}

/// Whether an operation surfaces its outcome on the event sink.
///
/// Startup replay runs the normal enable path with notification suppressed;
/// displacements it triggers are still reported.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Notify {
    Emit,
    Suppress,
}

struct RegistryInner {
    /// Known modules by name.
    modules: HashMap<String, Box<dyn DynamicModule>>,
    /// Names in discovery order.
    order: Vec<String>,
    /// Durable desired-state store.
    store: Box<dyn StateStore>,
}

/// Registry of feature modules.
///
/// Lifecycle: construct, [`discover`](Self::discover), serve operations,
/// [`unload`](Self::unload). Front ends hold a reference to one instance;
/// the registry is never global state.
pub struct ModuleRegistry {
    inner: Mutex<RegistryInner>,
    events: Arc<dyn EventSink>,
}

impl ModuleRegistry {
    pub fn new(store: Box<dyn StateStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                modules: HashMap::new(),
                order: Vec::new(),
                store,
            }),
            events,
        }
    }

    /// Populate the registry from a provider and replay persisted state.
    ///
    /// Idempotent per name: a name already present is not reloaded. Each
    /// newly registered module whose persisted desired state is `true` is
    /// enabled on the spot, in discovery order, with sink notification
    /// suppressed. Per-item load failures are reported and skipped; a
    /// persistence failure while replaying one module is logged and leaves
    /// that module disabled. Returns the names registered by this call.
    pub async fn discover(&self, provider: &mut dyn ModuleProvider) -> Vec<String> {
        info!("Discovering modules");
        let mut inner = self.inner.lock().await;
        let mut discovered = Vec::new();

        for item in provider.list_modules() {
            let module = match item {
                Ok(module) => module,
                Err(error) => {
                    let (origin, reason) = match &error {
                        ModuleError::LoadFailed { origin, reason } => {
                            (origin.clone(), reason.clone())
                        }
                        other => ("provider".to_string(), other.to_string()),
                    };
                    warn!("Skipping module from {}: {}", origin, reason);
                    self.events.emit(ModuleEvent::LoadFailed { origin, reason });
                    continue;
                }
            };

            let name = module.name().to_string();
            if inner.modules.contains_key(&name) {
                debug!("Module {} already registered, not reloading", name);
                continue;
            }

            debug!("Registered module: {}", name);
            inner.modules.insert(name.clone(), module);
            inner.order.push(name.clone());

            if inner.store.get(&state_key(&name), false) {
                if let Err(error) =
                    Self::enable_locked(&mut inner, self.events.as_ref(), &name, Notify::Suppress)
                        .await
                {
                    warn!("Failed to restore module {}: {}", name, error);
                }
            }

            discovered.push(name);
        }

        info!("Discovered {} modules", discovered.len());
        discovered
    }

    /// Enable a module, displacing enabled incompatible peers first.
    pub async fn enable(&self, name: &str) -> Result<EnableOutcome, ModuleError> {
        let mut inner = self.inner.lock().await;
        Self::enable_locked(&mut inner, self.events.as_ref(), name, Notify::Emit).await
    }

    /// Disable a module.
    pub async fn disable(&self, name: &str) -> Result<DisableOutcome, ModuleError> {
        let mut inner = self.inner.lock().await;
        Self::disable_locked(&mut inner, self.events.as_ref(), name, Notify::Emit).await
    }

    /// Disable every currently-enabled module, each through the normal
    /// disable path, and return how many actually transitioned.
    pub async fn disable_all(&self) -> Result<usize, ModuleError> {
        let mut inner = self.inner.lock().await;
        Self::disable_all_locked(&mut inner, self.events.as_ref(), Notify::Emit).await
    }

    /// Enable up to [`MAX_BATCH`] modules in the order given.
    ///
    /// With `exclusive`, every enabled module is disabled first. A batch
    /// member whose name was declared incompatible by an earlier member of
    /// the same batch is skipped with a conflict event instead of enabled;
    /// an unknown name is reported and the rest of the batch proceeds.
    pub async fn enable_set(
        &self,
        names: &[String],
        exclusive: bool,
    ) -> Result<BatchOutcome, ModuleError> {
        if names.len() > MAX_BATCH {
            return Err(ModuleError::BatchTooLarge(names.len()));
        }

        let mut inner = self.inner.lock().await;
        if exclusive {
            Self::disable_all_locked(&mut inner, self.events.as_ref(), Notify::Suppress).await?;
        }

        let mut outcome = BatchOutcome::default();
        // Incompatibility names declared by batch members enabled so far,
        // with the member that declared each.
        let mut blocked: Vec<(String, String)> = Vec::new();

        for name in names {
            if let Some((_, declared_by)) = blocked.iter().find(|(n, _)| n == name) {
                warn!(
                    "Module {} is incompatible with batch member {}",
                    name, declared_by
                );
                self.events.emit(ModuleEvent::ConflictSkipped {
                    module: name.clone(),
                    conflicts_with: declared_by.clone(),
                });
                outcome.skipped.push(name.clone());
                continue;
            }

            match Self::enable_locked(&mut inner, self.events.as_ref(), name, Notify::Emit).await {
                Ok(_) => {
                    let declared = inner
                        .modules
                        .get(name)
                        .map(|m| m.incompatible_with().to_vec())
                        .unwrap_or_default();
                    for peer in declared {
                        if !blocked.iter().any(|(n, _)| *n == peer) {
                            blocked.push((peer, name.clone()));
                        }
                    }
                    outcome.enabled.push(name.clone());
                }
                Err(ModuleError::UnknownModule(_)) => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(outcome)
    }

    /// Read-only snapshot of every known module, in discovery order.
    pub async fn status(&self) -> Vec<ModuleStatus> {
        let inner = self.inner.lock().await;
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner.modules.get(name).map(|module| ModuleStatus {
                    name: name.clone(),
                    enabled: module.is_enabled(),
                })
            })
            .collect()
    }

    /// Unload every known module exactly once, enabled or not, and discard
    /// all entries. Terminal: the registry is empty afterwards.
    pub async fn unload(&self) {
        let mut inner = self.inner.lock().await;
        info!("Unloading {} modules", inner.order.len());
        let names: Vec<String> = inner.order.drain(..).collect();
        for name in names {
            if let Some(mut module) = inner.modules.remove(&name) {
                debug!("Unloading module: {}", name);
                module.unload().await;
            }
        }
    }

    async fn enable_locked(
        inner: &mut RegistryInner,
        events: &dyn EventSink,
        name: &str,
        notify: Notify,
    ) -> Result<EnableOutcome, ModuleError> {
        let declared = match inner.modules.get(name) {
            Some(module) => module.incompatible_with().to_vec(),
            None => {
                events.emit(ModuleEvent::UnknownModule {
                    module: name.to_string(),
                });
                return Err(ModuleError::UnknownModule(name.to_string()));
            }
        };

        // Displace enabled incompatible peers through the normal disable
        // path, so each displacement is individually persisted and reported.
        for peer in conflict::displaced_modules(name, &declared, &inner.modules, &inner.order) {
            Self::disable_locked(inner, events, &peer, Notify::Emit).await?;
        }

        let module = inner
            .modules
            .get_mut(name)
            .ok_or_else(|| ModuleError::UnknownModule(name.to_string()))?;

        if !module.enable().await {
            if notify == Notify::Emit {
                events.emit(ModuleEvent::AlreadyEnabled {
                    module: name.to_string(),
                });
            }
            debug!("Module {} already enabled", name);
            return Ok(EnableOutcome::AlreadyEnabled);
        }

        let key = state_key(name);
        let previous = inner.store.get(&key, false);
        inner.store.set(&key, true);
        if let Err(error) = inner.store.save() {
            // Roll back so memory and durable state agree on the
            // pre-operation value; the caller may retry.
            module.disable().await;
            inner.store.set(&key, previous);
            return Err(ModuleError::Persistence(error));
        }

        if notify == Notify::Emit {
            events.emit(ModuleEvent::Enabled {
                module: name.to_string(),
            });
        }
        info!("Module {} enabled", name);
        Ok(EnableOutcome::Enabled)
    }

    async fn disable_locked(
        inner: &mut RegistryInner,
        events: &dyn EventSink,
        name: &str,
        notify: Notify,
    ) -> Result<DisableOutcome, ModuleError> {
        let module = match inner.modules.get_mut(name) {
            Some(module) => module,
            None => {
                events.emit(ModuleEvent::UnknownModule {
                    module: name.to_string(),
                });
                return Err(ModuleError::UnknownModule(name.to_string()));
            }
        };

        if !module.disable().await {
            if notify == Notify::Emit {
                events.emit(ModuleEvent::AlreadyDisabled {
                    module: name.to_string(),
                });
            }
            debug!("Module {} already disabled", name);
            return Ok(DisableOutcome::AlreadyDisabled);
        }

        let key = state_key(name);
        let previous = inner.store.get(&key, false);
        inner.store.set(&key, false);
        if let Err(error) = inner.store.save() {
            module.enable().await;
            inner.store.set(&key, previous);
            return Err(ModuleError::Persistence(error));
        }

        if notify == Notify::Emit {
            events.emit(ModuleEvent::Disabled {
                module: name.to_string(),
            });
        }
        info!("Module {} disabled", name);
        Ok(DisableOutcome::Disabled)
    }

    async fn disable_all_locked(
        inner: &mut RegistryInner,
        events: &dyn EventSink,
        notify: Notify,
    ) -> Result<usize, ModuleError> {
        let enabled: Vec<String> = inner
            .order
            .iter()
            .filter(|name| {
                inner
                    .modules
                    .get(*name)
                    .map(|module| module.is_enabled())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let mut count = 0;
        for name in &enabled {
            Self::disable_locked(inner, events, name, Notify::Emit).await?;
            count += 1;
        }

        if notify == Notify::Emit {
            if count > 0 {
                events.emit(ModuleEvent::AllDisabled { count });
            } else {
                events.emit(ModuleEvent::NoneEnabled);
            }
        }
        Ok(count)
    }
}
