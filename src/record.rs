//! Waystone record: immutable identity, mutable state, and the stable
//! persisted blob format.

use crate::types::{ActorId, ItemStack, WaystoneHash, WorldPos};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Hash & name derivation
// ---------------------------------------------------------------------------

/// Derive the registry key for a waystone from its display name, the
/// position of its lower half, and a creation nonce.
///
/// The hash is derived once at creation and carried verbatim afterwards
/// (blobs store it, restores keep it). The nonce is unique per placement,
/// so a structure re-placed at the same position never reproduces a
/// destroyed record's hash even if the generated name repeats.
pub fn waystone_hash(name: &str, position: &WorldPos, nonce: u64) -> WaystoneHash {
    let digest = md5::compute(format!(
        "{}#{}#{}#{}#{}#{}",
        name, position.world, position.x, position.y, position.z, nonce
    ));
    format!("{:x}", digest)
}

const NAME_PREFIXES: &[&str] = &[
    "ar", "bel", "dun", "el", "fen", "gal", "hol", "ith", "kar", "lor", "mor", "nar", "or", "per",
    "quel", "ryn", "sil", "thal", "ul", "ves",
];

const NAME_SUFFIXES: &[&str] = &[
    "a", "dor", "eth", "gard", "heim", "ia", "mont", "os", "stead", "vale", "wick", "yn",
];

/// Deterministically generate a display name from a seed.
///
/// Fresh placements feed a per-manager counter mixed with the position so
/// consecutive placements at one spot get distinct names (and therefore
/// distinct hashes).
pub fn generate_name(seed: u64) -> String {
    // xorshift64 keeps this dependency-free and stable across runs.
    let mut s = seed.wrapping_add(0x9e3779b97f4a7c15);
    let mut next = || {
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        s
    };

    let prefix = NAME_PREFIXES[(next() % NAME_PREFIXES.len() as u64) as usize];
    let middle = NAME_PREFIXES[(next() % NAME_PREFIXES.len() as u64) as usize];
    let suffix = NAME_SUFFIXES[(next() % NAME_SUFFIXES.len() as u64) as usize];

    let mut name = String::with_capacity(prefix.len() + middle.len() + suffix.len());
    name.push_str(prefix);
    if next() % 2 == 0 {
        name.push_str(middle);
    }
    name.push_str(suffix);

    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A single waystone known to the registry.
///
/// `hash` is immutable for the record's lifetime. All other fields are
/// mutated exclusively through [`crate::registry::WaystoneRegistry::update`]
/// so every change is mirrored to persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct WaystoneRecord {
    pub hash: WaystoneHash,
    pub name: String,
    /// Lower half of the physical structure.
    pub position: WorldPos,
    /// Unset until the first non-sneaking player interaction; set at most
    /// once, cleared only by an administrative reset.
    pub owner: Option<ActorId>,
    /// Global waystones are discovery-cost exempt and visible to all.
    pub is_global: bool,
    pub has_moss_overlay: bool,
    pub is_world_generated: bool,
    /// Discovery payments physically held by the structure.
    pub stored_inventory: Vec<ItemStack>,
}

impl WaystoneRecord {
    /// Create a fresh record; the hash is derived from name, position,
    /// and the creation nonce.
    pub fn new(name: impl Into<String>, position: WorldPos, nonce: u64) -> Self {
        let name = name.into();
        let hash = waystone_hash(&name, &position, nonce);
        Self {
            hash,
            name,
            position,
            owner: None,
            is_global: false,
            has_moss_overlay: false,
            is_world_generated: false,
            stored_inventory: Vec::new(),
        }
    }

    /// Derived activation state, recomputed on interaction and never
    /// persisted independently: a waystone reads active once claimed.
    pub fn is_active(&self) -> bool {
        self.owner.is_some()
    }

    pub fn has_storage(&self) -> bool {
        !self.stored_inventory.is_empty()
    }

    /// Drain the stored inventory (redemption / ejection).
    pub fn take_inventory(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stored_inventory)
    }

    pub fn to_blob(&self) -> RecordBlob {
        RecordBlob {
            hash: self.hash.clone(),
            name: self.name.clone(),
            world: self.position.world.clone(),
            x: self.position.x,
            y: self.position.y,
            z: self.position.z,
            owner: self.owner.clone(),
            is_global: self.is_global,
            has_moss_overlay: self.has_moss_overlay,
            is_world_generated: self.is_world_generated,
            inventory: self.stored_inventory.clone(),
        }
    }

    pub fn from_blob(blob: RecordBlob) -> Self {
        Self {
            hash: blob.hash,
            name: blob.name,
            position: WorldPos::new(blob.world, blob.x, blob.y, blob.z),
            owner: blob.owner,
            is_global: blob.is_global,
            has_moss_overlay: blob.has_moss_overlay,
            is_world_generated: blob.is_world_generated,
            stored_inventory: blob.inventory,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted blob
// ---------------------------------------------------------------------------

/// Stable persisted form of a [`WaystoneRecord`].
///
/// Identity and position are required; everything else defaults so blobs
/// written by older versions keep loading (owner absent, flags false,
/// inventory empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBlob {
    pub hash: String,
    pub name: String,
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_global: bool,
    #[serde(default)]
    pub has_moss_overlay: bool,
    #[serde(default)]
    pub is_world_generated: bool,
    #[serde(default)]
    pub inventory: Vec<ItemStack>,
}
