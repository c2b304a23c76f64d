//! Waystone Network Core
//!
//! The registry and teleportation-state core of a waystone network,
//! embedded in a voxel-world game host.
//!
//! ## Architecture
//!
//! ```text
//! WaystoneService  (service.rs)  ← interaction, travel, admin entry points
//!   ├── WaystoneRegistry   (registry.rs)  ← authoritative record directory
//!   │     └── PersistenceHandle (persist.rs) ← fire-and-forget mirroring
//!   ├── DiscoveryIndex     (discovery.rs) ← per-player sets + void anchors
//!   ├── StructureManager   (structure.rs) ← two-cell consistency machine
//!   ├── InteractionPolicy  (policy.rs)    ← pure permission/cost rules
//!   └── WorldAdapter       (world.rs)     ← platform boundary (positions,
//!                                            holdings, scatter, clear)
//! ```
//!
//! The host's single world-simulation thread drives every mutation;
//! presentation threads read concurrently through snapshot accessors
//! (`Registry::all`, `DiscoveryIndex::discovered`, …) and hand player
//! input back as `on_use` / `attempt_travel` calls. Service operations
//! return [`events::WaystoneEvent`] lists for the host to render; the
//! core exposes no network protocol of its own.

pub mod discovery;
pub mod events;
pub mod persist;
pub mod policy;
pub mod record;
pub mod registry;
pub mod service;
pub mod structure;
pub mod travel;
pub mod types;
pub mod world;

// Convenience re-exports
pub use discovery::{DiscoveryIndex, VoidAnchor};
pub use events::WaystoneEvent;
pub use persist::{
    InMemoryStore, JsonFileStore, PersistenceHandle, PersistenceStore, PersistenceWriter,
};
pub use policy::{InteractionPolicy, PolicyDecision};
pub use record::{generate_name, waystone_hash, RecordBlob, WaystoneRecord};
pub use registry::WaystoneRegistry;
pub use service::{PlaceOutcome, UseError, UseOutcome, WaystoneService};
pub use structure::{
    BreakOutcome, HarvestDrop, PlacementContext, StructureError, StructureManager, StructurePhase,
};
pub use travel::{CostPolicy, TravelError, TravelSource, TravelTransaction};
pub use types::{
    ActorContext, ActorId, BreakPermission, Facing, HeldItem, ItemStack, WaystoneHash,
    WaystoneStats, WaystonesConfig, WorldPos,
};
pub use world::{SimWorld, WorldAdapter};
