//! Notifications handed back to the presentation layer.
//!
//! The core exposes no network protocol of its own: service operations
//! return the events they produced and the embedding host renders them
//! (chat line, toast, sound, …). Events are emitted strictly **after** a
//! successful commit; a failed operation returns an error and no events.
//!
//! ## Design rules
//!
//! 1. Every variant is `Serialize + Deserialize` with snake_case JSON and
//!    an internal `type` tag, so hosts can forward events verbatim.
//! 2. No registry internals leak out: events carry hashes, names, and
//!    positions, never records.
//! 3. One event per observable fact; hosts aggregate, the core does not.

use crate::types::{ItemStack, WorldPos};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaystoneEvent {
    /// A player unlocked a waystone for future travel.
    Discovered {
        player: String,
        hash: String,
        name: String,
        /// The discovery payment taken, if any.
        cost: Option<ItemStack>,
    },

    /// First non-sneaking interaction claimed the waystone.
    OwnerClaimed { hash: String, owner: String },

    /// Owner or operator renamed the waystone.
    NameChanged { hash: String, name: String },

    /// Operator toggled the discovery-cost exemption.
    GlobalChanged { hash: String, is_global: bool },

    /// Moss overlay applied or sheared off (both halves agree).
    MossChanged { hash: String, mossy: bool },

    /// A travel transaction committed.
    Travelled {
        player: String,
        /// Destination waystone or void anchor id.
        hash: String,
        position: WorldPos,
    },

    /// A structure completed placement and its record was registered.
    StructurePlaced { hash: String, position: WorldPos },

    /// A structure was torn down and its record removed.
    StructureRemoved { hash: String, position: WorldPos },

    /// Stored payments were ejected into the world.
    InventoryEjected {
        hash: String,
        position: WorldPos,
        items: Vec<ItemStack>,
    },
}
