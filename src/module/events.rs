//! Lifecycle event surface
//!
//! The registry reports every outcome as a discrete event through an
//! [`EventSink`]. Sinks render events for a user; they hold no reference
//! back to the registry, so they cannot trigger further mutation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One registry lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleEvent {
    /// A module transitioned to enabled.
    Enabled { module: String },
    /// A module transitioned to disabled.
    Disabled { module: String },
    /// Enable requested on a module that was already enabled.
    AlreadyEnabled { module: String },
    /// Disable requested on a module that was already disabled.
    AlreadyDisabled { module: String },
    /// An operation referenced a name with no registry entry.
    UnknownModule { module: String },
    /// A batch member was skipped because an earlier member of the same
    /// batch declared it incompatible.
    ConflictSkipped { module: String, conflicts_with: String },
    /// Disable-all found nothing enabled.
    NoneEnabled,
    /// Disable-all transitioned `count` modules.
    AllDisabled { count: usize },
    /// A module failed to load during discovery and was skipped.
    LoadFailed { origin: String, reason: String },
}

/// Receiver of registry lifecycle events.
///
/// `emit` must not call back into the registry.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ModuleEvent);
}

/// Renders events as `tracing` log lines.
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: ModuleEvent) {
        match event {
            ModuleEvent::Enabled { module } => info!("Module enabled: {}", module),
            ModuleEvent::Disabled { module } => info!("Module disabled: {}", module),
            ModuleEvent::AlreadyEnabled { module } => {
                info!("Module {} already enabled", module)
            }
            ModuleEvent::AlreadyDisabled { module } => {
                info!("Module {} already disabled", module)
            }
            ModuleEvent::UnknownModule { module } => warn!("Unknown module: {}", module),
            ModuleEvent::ConflictSkipped {
                module,
                conflicts_with,
            } => warn!(
                "Module {} skipped: incompatible with {}",
                module, conflicts_with
            ),
            ModuleEvent::NoneEnabled => info!("No modules are enabled"),
            ModuleEvent::AllDisabled { count } => info!("All {} enabled modules disabled", count),
            ModuleEvent::LoadFailed { origin, reason } => {
                warn!("Failed to load module from {}: {}", origin, reason)
            }
        }
    }
}

/// Forwards events into an unbounded channel.
///
/// The receiving half is handed to whoever presents events to the user;
/// tests consume it to assert on emitted sequences.
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ModuleEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ModuleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: ModuleEvent) {
        if self.tx.send(event).is_err() {
            warn!("Event receiver dropped, discarding event");
        }
    }
}

/// Discards every event.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: ModuleEvent) {}
}
