//! Per-player discovery bookkeeping: which waystones a player has
//! unlocked, plus their private void anchors.
//!
//! This module is pure set arithmetic; cost checking and notifications
//! belong to the policy and service layers, keyed off the transition
//! booleans returned here. Stale hashes (waystone destroyed after
//! discovery) are deliberately left in place; the registry's not-found
//! contract makes them harmless.

use crate::types::{ActorId, WaystoneHash, WorldPos};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Void anchors
// ---------------------------------------------------------------------------

/// A player-private pseudo-waystone. Never enters the global registry;
/// only its owner can resolve it as a travel destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidAnchor {
    pub id: String,
    pub name: String,
    pub position: WorldPos,
}

// ---------------------------------------------------------------------------
// Per-player set
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DiscoverySet {
    discovered: HashSet<WaystoneHash>,
    void_anchors: HashMap<String, VoidAnchor>,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// All players' discovery sets.
#[derive(Default)]
pub struct DiscoveryIndex {
    sets: RwLock<HashMap<ActorId, DiscoverySet>>,
}

impl DiscoveryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent add. Returns `true` only on the absent→present
    /// transition; one-time side effects (cost deduction, notification)
    /// key off this.
    pub fn discover(&self, player: &str, hash: &str) -> bool {
        self.sets
            .write()
            .entry(player.to_string())
            .or_default()
            .discovered
            .insert(hash.to_string())
    }

    pub fn contains(&self, player: &str, hash: &str) -> bool {
        self.sets
            .read()
            .get(player)
            .is_some_and(|set| set.discovered.contains(hash))
    }

    /// Sorted snapshot of a player's discovered hashes (stable for UI).
    pub fn discovered(&self, player: &str) -> Vec<WaystoneHash> {
        let sets = self.sets.read();
        let mut hashes: Vec<WaystoneHash> = sets
            .get(player)
            .map(|set| set.discovered.iter().cloned().collect())
            .unwrap_or_default();
        hashes.sort();
        hashes
    }

    /// Remove one hash from one player's set.
    pub fn forget(&self, player: &str, hash: &str) -> bool {
        self.sets
            .write()
            .get_mut(player)
            .is_some_and(|set| set.discovered.remove(hash))
    }

    /// Administrative batch removal of a hash across every player, used
    /// when a waystone is permanently deleted. Returns how many sets
    /// dropped the entry.
    pub fn forget_all(&self, hash: &str) -> usize {
        let mut sets = self.sets.write();
        sets.values_mut()
            .map(|set| set.discovered.remove(hash))
            .filter(|&removed| removed)
            .count()
    }

    // -----------------------------------------------------------------------
    // Void anchors
    // -----------------------------------------------------------------------

    pub fn bind_void_anchor(&self, player: &str, anchor: VoidAnchor) {
        self.sets
            .write()
            .entry(player.to_string())
            .or_default()
            .void_anchors
            .insert(anchor.id.clone(), anchor);
    }

    pub fn void_anchor(&self, player: &str, id: &str) -> Option<VoidAnchor> {
        self.sets
            .read()
            .get(player)
            .and_then(|set| set.void_anchors.get(id).cloned())
    }

    pub fn unbind_void_anchor(&self, player: &str, id: &str) -> bool {
        self.sets
            .write()
            .get_mut(player)
            .is_some_and(|set| set.void_anchors.remove(id).is_some())
    }

    /// A player's anchors, sorted by id.
    pub fn anchors(&self, player: &str) -> Vec<VoidAnchor> {
        let sets = self.sets.read();
        let mut anchors: Vec<VoidAnchor> = sets
            .get(player)
            .map(|set| set.void_anchors.values().cloned().collect())
            .unwrap_or_default();
        anchors.sort_by(|a, b| a.id.cmp(&b.id));
        anchors
    }

    // -----------------------------------------------------------------------
    // Stats
    // -----------------------------------------------------------------------

    pub fn tracked_players(&self) -> usize {
        self.sets.read().len()
    }

    pub fn anchor_count(&self) -> usize {
        self.sets
            .read()
            .values()
            .map(|set| set.void_anchors.len())
            .sum()
    }
}
