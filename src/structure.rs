//! Structure consistency: the two-cell physical invariant behind every
//! waystone record.
//!
//! A waystone occupies a lower and an upper cell. The lower half owns the
//! record; the upper half is a placement echo with no independent state.
//! The manager exposes the lifecycle handlers the platform adapter drives
//! (`on_place`, `on_break`, `on_state_replaced`) as pure state-machine
//! transitions over one logical structure entity; the paired half is
//! never mutated on its own path.

use crate::events::WaystoneEvent;
use crate::record::{generate_name, RecordBlob, WaystoneRecord};
use crate::registry::WaystoneRegistry;
use crate::types::{ActorContext, Facing, ItemStack, WaystoneHash, WaystonesConfig, WorldPos};
use crate::world::WorldAdapter;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Host item id of the retrievable structure representation.
pub const WAYSTONE_ITEM: &str = "waystone";

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Lifecycle state of one physical structure.
///
/// `Unplaced → LowerPlaced → Complete` happens atomically inside
/// [`StructureManager::on_place`]: the upper half is auto-placed by the
/// placement operation and is never placed independently by a player.
/// `Removed` is terminal; the hash becomes eligible for
/// [`crate::discovery::DiscoveryIndex::forget_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructurePhase {
    Unplaced,
    LowerPlaced,
    Complete,
    PartiallyBroken,
    Removed,
}

#[derive(Debug, Clone)]
struct StructureState {
    phase: StructurePhase,
    facing: Facing,
    waterlogged: bool,
}

// ---------------------------------------------------------------------------
// Inputs & outcomes
// ---------------------------------------------------------------------------

/// Context the platform hands to [`StructureManager::on_place`].
#[derive(Debug, Clone, Default)]
pub struct PlacementContext {
    /// The placing actor, when a player drove the placement.
    pub placer: Option<ActorContext>,
    /// Persisted state carried by the placed item (sneak-broken waystone);
    /// restores the old record, and therefore the old hash, at the new
    /// position.
    pub carried_blob: Option<RecordBlob>,
    /// Structure placed by world generation.
    pub world_generated: bool,
    pub facing: Facing,
    pub waterlogged: bool,
}

/// The retrievable item produced by a permitted, non-creative break.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestDrop {
    pub item: ItemStack,
    /// Record state embedded by the sneak-preserve gesture, if any. The
    /// host attaches this to the physical item so a later placement can
    /// hand it back via [`PlacementContext::carried_blob`].
    pub preserved: Option<RecordBlob>,
}

/// Result of a teardown. Both removal paths are idempotent: a second
/// attempt for the same structure yields an empty outcome.
#[derive(Debug, Clone, Default)]
pub struct BreakOutcome {
    pub hash: Option<WaystoneHash>,
    /// Snapshot of the record that was removed.
    pub record: Option<WaystoneRecord>,
    /// Stored payments ejected at the structure top.
    pub ejected: Vec<ItemStack>,
    pub harvest: Option<HarvestDrop>,
}

#[derive(Debug, thiserror::Error)]
pub enum StructureError {
    #[error("position {0} cannot host a waystone")]
    Obstructed(WorldPos),
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

pub struct StructureManager {
    registry: Arc<WaystoneRegistry>,
    adapter: Arc<dyn WorldAdapter>,
    config: WaystonesConfig,
    /// Both halves of every complete structure map to its hash.
    by_position: RwLock<HashMap<WorldPos, WaystoneHash>>,
    states: RwLock<HashMap<WaystoneHash, StructureState>>,
    /// Mixed into generated names so consecutive placements at one spot
    /// never reproduce a destroyed record's hash.
    placement_counter: AtomicU64,
}

impl StructureManager {
    pub fn new(
        registry: Arc<WaystoneRegistry>,
        adapter: Arc<dyn WorldAdapter>,
        config: WaystonesConfig,
    ) -> Self {
        Self {
            registry,
            adapter,
            config,
            by_position: RwLock::new(HashMap::new()),
            states: RwLock::new(HashMap::new()),
            placement_counter: AtomicU64::new(0),
        }
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Rebuild the position index from registry contents (session load).
    pub fn rebuild_index(&self) {
        let mut by_position = self.by_position.write();
        let mut states = self.states.write();
        by_position.clear();
        states.clear();
        for record in self.registry.all() {
            by_position.insert(record.position.clone(), record.hash.clone());
            by_position.insert(record.position.up(), record.hash.clone());
            states.insert(
                record.hash.clone(),
                StructureState {
                    phase: StructurePhase::Complete,
                    facing: Facing::North,
                    waterlogged: false,
                },
            );
        }
        debug!("Structure index rebuilt: {} entries", by_position.len());
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Resolve the waystone occupying `pos` (either half).
    pub fn waystone_at(&self, pos: &WorldPos) -> Option<WaystoneHash> {
        self.by_position.read().get(pos).cloned()
    }

    pub fn phase(&self, hash: &str) -> StructurePhase {
        self.states
            .read()
            .get(hash)
            .map(|s| s.phase)
            .unwrap_or(StructurePhase::Unplaced)
    }

    pub fn is_waterlogged(&self, hash: &str) -> bool {
        self.states
            .read()
            .get(hash)
            .map(|s| s.waterlogged)
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place a structure with its lower half at `pos`.
    ///
    /// Runs the whole `Unplaced → LowerPlaced → Complete` chain: the upper
    /// half is an echo of this operation. The record enters the registry
    /// at the `Complete` transition, pre-seeded from a carried blob when
    /// the actor placed a preserved waystone item.
    pub fn on_place(
        &self,
        pos: WorldPos,
        ctx: PlacementContext,
    ) -> Result<WaystoneHash, StructureError> {
        let upper = pos.up();
        {
            let by_position = self.by_position.read();
            if by_position.contains_key(&pos) || by_position.contains_key(&upper) {
                return Err(StructureError::Obstructed(pos));
            }
        }

        // Carried data is only honoured for player placements; worldgen
        // and mechanism placements always mint a fresh record.
        let carried = if ctx.placer.is_some() {
            ctx.carried_blob
        } else {
            None
        };
        let mut record = match carried {
            Some(blob) if !self.registry.contains(&blob.hash) => {
                let mut record = WaystoneRecord::from_blob(blob);
                record.position = pos.clone();
                record
            }
            other => {
                if other.is_some() {
                    warn!("Carried waystone data collides with a live record, rolling fresh");
                }
                let seed = self.next_seed(&pos);
                WaystoneRecord::new(generate_name(seed), pos.clone(), seed)
            }
        };
        record.is_world_generated = ctx.world_generated;
        let hash = record.hash.clone();

        self.states.write().insert(
            hash.clone(),
            StructureState {
                phase: StructurePhase::LowerPlaced,
                facing: ctx.facing,
                waterlogged: ctx.waterlogged,
            },
        );

        // Upper half echo + registry insert complete the structure.
        if !self.registry.add(record) {
            // First-writer-wins raced us; keep the existing record.
            debug!("Waystone {} already registered, placement is a no-op", hash);
        }
        {
            let mut by_position = self.by_position.write();
            by_position.insert(pos.clone(), hash.clone());
            by_position.insert(upper, hash.clone());
        }
        if let Some(state) = self.states.write().get_mut(&hash) {
            state.phase = StructurePhase::Complete;
        }

        debug!("Structure complete at {} ({})", pos, hash);
        Ok(hash)
    }

    fn next_seed(&self, pos: &WorldPos) -> u64 {
        let counter = self.placement_counter.fetch_add(1, Ordering::Relaxed);
        let mut seed = counter.wrapping_mul(0x100000001b3);
        seed ^= (pos.x as u64).wrapping_mul(0x9e3779b1);
        seed ^= (pos.y as u64).wrapping_mul(0x85ebca6b);
        seed ^= (pos.z as u64).wrapping_mul(0xc2b2ae35);
        seed ^= pos.world.bytes().fold(0u64, |acc, b| {
            acc.wrapping_mul(31).wrapping_add(b as u64)
        });
        seed
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// An actor broke either half of the structure at `pos`.
    ///
    /// Permission gating happens before the physical break (see
    /// [`crate::service::WaystoneService::can_break`]); by the time this
    /// runs the break is a fact to reconcile, so it always succeeds. The
    /// paired half is forcibly cleared in the same operation, the record
    /// leaves the registry, stored payments are ejected, and a permitted
    /// non-creative actor receives the structure item, with the record
    /// blob embedded if they used the sneak-preserve gesture.
    pub fn on_break(&self, pos: &WorldPos, actor: Option<&ActorContext>) -> BreakOutcome {
        self.teardown(pos, actor)
    }

    /// Either half was replaced by an incompatible block outside the break
    /// path (explosion, world edit). Same teardown, no harvest. When the
    /// replacement is itself part of a waystone (half mirroring), the
    /// structure is intact and nothing happens.
    ///
    /// Racing removal paths are fine: whichever runs second finds the
    /// index empty and returns an empty outcome.
    pub fn on_state_replaced(&self, pos: &WorldPos, replacement_is_waystone: bool) -> BreakOutcome {
        if replacement_is_waystone {
            return BreakOutcome::default();
        }
        self.teardown(pos, None)
    }

    fn teardown(&self, pos: &WorldPos, actor: Option<&ActorContext>) -> BreakOutcome {
        let Some(hash) = self.waystone_at(pos) else {
            // Already removed (or never placed); idempotent no-op.
            return BreakOutcome::default();
        };

        if let Some(state) = self.states.write().get_mut(&hash) {
            state.phase = StructurePhase::PartiallyBroken;
        }

        let record = self.registry.remove(&hash);
        let Some(record) = record else {
            // Index said structure, registry said nothing: repair by
            // clearing whatever cells still claim the hash.
            warn!("Structure at {} had no record; tearing down", pos);
            self.clear_structure_cells(&hash);
            return BreakOutcome::default();
        };

        let lower = record.position.clone();
        let upper = lower.up();
        self.clear_structure_cells(&hash);
        self.adapter.clear_block(&lower);
        self.adapter.clear_block(&upper);

        let mut removed = record;
        let ejected = removed.take_inventory();
        if !ejected.is_empty() {
            self.adapter.scatter_items(&upper, ejected.clone());
        }

        let harvest = actor.filter(|a| !a.creative).map(|a| {
            if removed.has_moss_overlay {
                self.adapter
                    .scatter_items(&upper, vec![ItemStack::new(self.config.growth_item.clone(), 1)]);
            }
            let preserved =
                (self.config.store_data_on_sneak_break && a.sneaking).then(|| removed.to_blob());
            HarvestDrop {
                item: ItemStack::new(WAYSTONE_ITEM, 1),
                preserved,
            }
        });

        if let Some(state) = self.states.write().get_mut(&hash) {
            state.phase = StructurePhase::Removed;
        }
        debug!("Structure at {} removed ({})", lower, hash);

        BreakOutcome {
            hash: Some(hash),
            record: Some(removed),
            ejected,
            harvest,
        }
    }

    fn clear_structure_cells(&self, hash: &str) {
        self.by_position.write().retain(|_, h| h != hash);
    }

    // -----------------------------------------------------------------------
    // Cosmetic side transitions
    // -----------------------------------------------------------------------

    /// Apply or strip the moss overlay. Both halves agree by construction
    /// because the flag lives on the one logical record. Returns `true` if
    /// the flag actually changed.
    pub fn set_moss(&self, pos: &WorldPos, mossy: bool) -> bool {
        let Some(hash) = self.waystone_at(pos) else {
            return false;
        };
        let Some(record) = self.registry.get(&hash) else {
            return false;
        };
        if record.has_moss_overlay == mossy {
            return false;
        }
        self.registry.update(&hash, |r| r.has_moss_overlay = mossy)
    }

    /// Mirror the fluid state across both halves.
    pub fn set_waterlogged(&self, pos: &WorldPos, waterlogged: bool) -> bool {
        let Some(hash) = self.waystone_at(pos) else {
            return false;
        };
        let mut states = self.states.write();
        match states.get_mut(&hash) {
            Some(state) => {
                state.waterlogged = waterlogged;
                true
            }
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Repair index/registry drift: index entries whose record vanished
    /// are dropped, records that lost their index entries are re-indexed.
    /// Returns the number of repairs made.
    pub fn reconcile(&self) -> usize {
        let mut repairs = 0;

        let live: Vec<WaystoneRecord> = self.registry.all();
        {
            let mut by_position = self.by_position.write();
            let before = by_position.len();
            by_position.retain(|_, hash| live.iter().any(|r| &r.hash == hash));
            repairs += before - by_position.len();

            for record in &live {
                for cell in [record.position.clone(), record.position.up()] {
                    if !by_position.contains_key(&cell) {
                        by_position.insert(cell, record.hash.clone());
                        repairs += 1;
                    }
                }
            }
        }

        if repairs > 0 {
            warn!("Structure reconcile repaired {} entr(ies)", repairs);
        }
        repairs
    }
}

// ---------------------------------------------------------------------------
// Event helpers
// ---------------------------------------------------------------------------

impl BreakOutcome {
    /// Presentation events describing this teardown.
    pub fn events(&self) -> Vec<WaystoneEvent> {
        let mut events = Vec::new();
        if let (Some(hash), Some(record)) = (&self.hash, &self.record) {
            events.push(WaystoneEvent::StructureRemoved {
                hash: hash.clone(),
                position: record.position.clone(),
            });
            if !self.ejected.is_empty() {
                events.push(WaystoneEvent::InventoryEjected {
                    hash: hash.clone(),
                    position: record.position.up(),
                    items: self.ejected.clone(),
                });
            }
        }
        events
    }
}
