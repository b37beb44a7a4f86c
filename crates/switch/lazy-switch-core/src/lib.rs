//! Lazy Switch core (engine-agnostic)
//!
//! A multi-state switch maps an integer state onto on/off decisions for a
//! heterogeneous set of scene targets. This crate holds the authoring table,
//! the kind resolver, the switch state machine with master/slave mirroring,
//! and the build-time pass that bakes authoring data into per-target masks.
//! Scene access, networking and storage are supplied by the host through the
//! traits in [`host`].

pub mod binding;
pub mod config;
pub mod consolidate;
pub mod detectors;
pub mod error;
pub mod host;
pub mod ids;
pub mod kind;
pub mod link;
pub mod mask;
pub mod resolver;
pub mod respawn;
pub mod runtime;
pub mod switch;
pub mod table;

// Re-exports for consumers (adapters)
pub use binding::{AnimatorParameter, TargetBinding};
pub use config::{Config, FixupMode};
pub use consolidate::{consolidate, ConsolidationReport};
pub use detectors::{EnableDetector, InteractionBlocker, PlayerEnterDetector};
pub use error::SwitchError;
pub use host::{is_available_on_runtime, Host, Networking, PlayerStore, TargetHost};
pub use ids::{IdAllocator, PlayerId, PlayerRef, SwitchId, TargetRef};
pub use kind::{Capabilities, ParticleModule, Property, TargetKind};
pub use mask::{StateMask, MAX_STATES};
pub use respawn::{Pose, RespawnHost, RespawnOutcome, RespawnTarget, Respawner, TriggerMode};
pub use runtime::SwitchRuntime;
pub use switch::Switch;
pub use table::{AuthoredTarget, BindingTable, Entry};
