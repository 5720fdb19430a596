//! Feature-module registry and lifecycle management
//!
//! The registry owns the set of known modules and mediates every enable and
//! disable so that no two modules related by a declared incompatibility are
//! ever enabled together, and so that every transition reaches the durable
//! state store before it is reported.
//!
//! ## Architecture
//!
//! - **Single Writer**: all mutating operations serialize on one mutex
//!   around the module table and the state store
//! - **Declared Incompatibility**: modules name the peers they displace;
//!   the relation is honored from whichever side it is declared
//! - **Collaborators Behind Seams**: discovery ([`ModuleProvider`]),
//!   persistence ([`crate::state::StateStore`]) and notification
//!   ([`EventSink`]) are all swappable interfaces

pub mod conflict;
pub mod events;
pub mod manifest;
pub mod provider;
pub mod registry;
pub mod traits;

pub use events::{ChannelEventSink, EventSink, LogEventSink, ModuleEvent, NullEventSink};
pub use manifest::{DeclaredModule, ManifestProvider, ModuleManifest};
pub use provider::{LoadResult, ModuleProvider, StaticProvider};
pub use registry::{
    BatchOutcome, DisableOutcome, EnableOutcome, ModuleRegistry, ModuleStatus, MAX_BATCH,
};
pub use traits::{DynamicModule, ModuleError};
