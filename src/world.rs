//! World/platform boundary: the adapter trait the core calls for every
//! physical effect, plus an in-memory implementation for tests and the
//! host binary.
//!
//! The core never places or renders blocks itself; it asks the adapter to
//! move actors, move items, and clear cells, and trusts the host to keep
//! the physical world in step.

use crate::types::{ItemStack, WorldPos};
use parking_lot::Mutex;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Everything the waystone core needs from the host world.
pub trait WorldAdapter: Send + Sync {
    /// Current position of an actor, if the host still tracks them.
    fn actor_position(&self, actor: &str) -> Option<WorldPos>;

    /// Relocate an actor, potentially across worlds. The host applies
    /// this immediately; travel commit depends on it not failing silently.
    fn set_actor_position(&self, actor: &str, pos: &WorldPos);

    /// How many of `item` the actor currently holds.
    fn count_item(&self, actor: &str, item: &str) -> u32;

    /// Remove exactly `amount` of `item` from the actor's holdings.
    /// Returns `false` (and removes nothing) if they hold fewer.
    fn remove_item(&self, actor: &str, item: &str, amount: u32) -> bool;

    /// Drop item stacks into the world at a position.
    fn scatter_items(&self, pos: &WorldPos, items: Vec<ItemStack>);

    /// Clear a structure cell (used to force the paired half out of the
    /// world during teardown).
    fn clear_block(&self, pos: &WorldPos);
}

// ---------------------------------------------------------------------------
// In-memory world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SimWorldState {
    positions: HashMap<String, WorldPos>,
    holdings: HashMap<String, HashMap<String, u32>>,
    scattered: Vec<(WorldPos, ItemStack)>,
    cleared: Vec<WorldPos>,
}

/// Reference [`WorldAdapter`] backed by plain maps.
///
/// Used by the test suite and by `waystones-host`; also a template for
/// real host integrations (every journal below corresponds to one host
/// callback).
#[derive(Default)]
pub struct SimWorld {
    state: Mutex<SimWorldState>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place_actor(&self, actor: &str, pos: WorldPos) {
        self.state.lock().positions.insert(actor.to_string(), pos);
    }

    pub fn grant_item(&self, actor: &str, item: &str, amount: u32) {
        *self
            .state
            .lock()
            .holdings
            .entry(actor.to_string())
            .or_default()
            .entry(item.to_string())
            .or_insert(0) += amount;
    }

    /// Items scattered at exactly `pos`, in scatter order.
    pub fn scattered_at(&self, pos: &WorldPos) -> Vec<ItemStack> {
        self.state
            .lock()
            .scattered
            .iter()
            .filter(|(p, _)| p == pos)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// Every cell the core asked to be cleared, in order.
    pub fn cleared_blocks(&self) -> Vec<WorldPos> {
        self.state.lock().cleared.clone()
    }
}

impl WorldAdapter for SimWorld {
    fn actor_position(&self, actor: &str) -> Option<WorldPos> {
        self.state.lock().positions.get(actor).cloned()
    }

    fn set_actor_position(&self, actor: &str, pos: &WorldPos) {
        self.state
            .lock()
            .positions
            .insert(actor.to_string(), pos.clone());
    }

    fn count_item(&self, actor: &str, item: &str) -> u32 {
        self.state
            .lock()
            .holdings
            .get(actor)
            .and_then(|h| h.get(item))
            .copied()
            .unwrap_or(0)
    }

    fn remove_item(&self, actor: &str, item: &str, amount: u32) -> bool {
        let mut state = self.state.lock();
        let Some(count) = state.holdings.get_mut(actor).and_then(|h| h.get_mut(item)) else {
            return amount == 0;
        };
        if *count < amount {
            return false;
        }
        *count -= amount;
        true
    }

    fn scatter_items(&self, pos: &WorldPos, items: Vec<ItemStack>) {
        let mut state = self.state.lock();
        for stack in items {
            state.scattered.push((pos.clone(), stack));
        }
    }

    fn clear_block(&self, pos: &WorldPos) {
        self.state.lock().cleared.push(pos.clone());
    }
}
