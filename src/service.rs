//! WaystoneService, the facade the host embeds.
//!
//! Owns the registry, discovery index, structure manager, and policy, and
//! wires them to the platform adapter. One service instance is created on
//! session load (explicit init, no ambient statics) and dropped on
//! unload. All mutating entry points are driven by the single
//! world-simulation thread; presentation threads read through the
//! snapshot accessors.

use crate::discovery::DiscoveryIndex;
use crate::events::WaystoneEvent;
use crate::persist::{PersistenceHandle, PersistenceStore};
use crate::policy::{InteractionPolicy, PolicyDecision};
use crate::registry::WaystoneRegistry;
use crate::structure::{BreakOutcome, PlacementContext, StructureError, StructureManager};
use crate::travel::{CostPolicy, TravelError, TravelSource, TravelTransaction};
use crate::types::{
    ActorContext, HeldItem, ItemStack, WaystoneHash, WaystoneStats, WaystonesConfig, WorldPos,
};
use crate::world::WorldAdapter;
use log::{info, warn};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Outcomes & errors
// ---------------------------------------------------------------------------

/// Result of a successful [`WaystoneService::on_use`] interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UseOutcome {
    /// Whether the host should open the waystone selection menu. Opens
    /// only when the discovery or ownership step succeeded.
    pub open_menu: bool,
    pub events: Vec<WaystoneEvent>,
}

impl UseOutcome {
    fn silent() -> Self {
        Self {
            open_menu: false,
            events: Vec::new(),
        }
    }
}

/// Result of a successful [`WaystoneService::place`].
#[derive(Debug, Clone)]
pub struct PlaceOutcome {
    pub hash: WaystoneHash,
    pub events: Vec<WaystoneEvent>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UseError {
    #[error("no waystone structure at {0}")]
    NoStructure(WorldPos),

    #[error("waystone {0} does not exist")]
    UnknownWaystone(String),

    #[error("not permitted")]
    PermissionDenied,

    /// Discovery payment missing: nothing was discovered and no menu
    /// opens.
    #[error("discovering this waystone requires {amount} {item}")]
    MissingDiscoveryItem { item: String, amount: u32 },
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct WaystoneService {
    registry: Arc<WaystoneRegistry>,
    discovery: DiscoveryIndex,
    structures: StructureManager,
    policy: InteractionPolicy,
    adapter: Arc<dyn WorldAdapter>,
}

impl WaystoneService {
    pub fn new(
        config: WaystonesConfig,
        adapter: Arc<dyn WorldAdapter>,
        persistence: PersistenceHandle,
    ) -> Self {
        let registry = Arc::new(WaystoneRegistry::new(persistence));
        let structures = StructureManager::new(registry.clone(), adapter.clone(), config.clone());
        Self {
            registry,
            discovery: DiscoveryIndex::new(),
            structures,
            policy: InteractionPolicy::new(config),
            adapter,
        }
    }

    /// Hydrate from the store and rebuild the structure index.
    pub fn load(&self, store: &dyn PersistenceStore) -> usize {
        let loaded = self.registry.load_from(store);
        self.structures.rebuild_index();
        info!("Waystone service loaded {} record(s)", loaded);
        loaded
    }

    /// Synchronous full flush (autosave / shutdown).
    pub fn save_all(&self, store: &dyn PersistenceStore) {
        self.registry.save_all(store);
    }

    // -----------------------------------------------------------------------
    // Accessors (presentation layer reads)
    // -----------------------------------------------------------------------

    pub fn registry(&self) -> &WaystoneRegistry {
        &self.registry
    }

    pub fn discovery(&self) -> &DiscoveryIndex {
        &self.discovery
    }

    pub fn structures(&self) -> &StructureManager {
        &self.structures
    }

    pub fn policy(&self) -> &InteractionPolicy {
        &self.policy
    }

    pub fn stats(&self) -> WaystoneStats {
        let all = self.registry.all();
        WaystoneStats {
            registered: all.len(),
            global: all.iter().filter(|r| r.is_global).count(),
            tracked_players: self.discovery.tracked_players(),
            void_anchors: self.discovery.anchor_count(),
        }
    }

    // -----------------------------------------------------------------------
    // Structure lifecycle (platform adapter entry points)
    // -----------------------------------------------------------------------

    pub fn place(
        &self,
        pos: WorldPos,
        ctx: PlacementContext,
    ) -> Result<PlaceOutcome, StructureError> {
        let hash = self.structures.on_place(pos.clone(), ctx)?;
        Ok(PlaceOutcome {
            events: vec![WaystoneEvent::StructurePlaced {
                hash: hash.clone(),
                position: pos,
            }],
            hash,
        })
    }

    /// Pre-break permission query; the host refuses the physical break on
    /// a denial. Positions without a waystone are always allowed.
    pub fn can_break(&self, actor: &ActorContext, pos: &WorldPos) -> PolicyDecision {
        let Some(hash) = self.structures.waystone_at(pos) else {
            return PolicyDecision::Allowed;
        };
        match self.registry.get(&hash) {
            Some(record) => self.policy.can_break(actor, &record),
            None => PolicyDecision::Allowed,
        }
    }

    pub fn break_structure(&self, pos: &WorldPos, actor: Option<&ActorContext>) -> BreakOutcome {
        self.structures.on_break(pos, actor)
    }

    pub fn on_state_replaced(&self, pos: &WorldPos, replacement_is_waystone: bool) -> BreakOutcome {
        self.structures.on_state_replaced(pos, replacement_is_waystone)
    }

    // -----------------------------------------------------------------------
    // Interaction
    // -----------------------------------------------------------------------

    /// A player used (right-clicked) either half of the structure at
    /// `pos`. Dispatches on the held-item capability tag; the empty hand
    /// runs the redemption / discovery / claim path.
    pub fn on_use(&self, actor: &ActorContext, pos: &WorldPos) -> Result<UseOutcome, UseError> {
        let Some(hash) = self.structures.waystone_at(pos) else {
            return Err(UseError::NoStructure(pos.clone()));
        };
        let Some(record) = self.registry.get(&hash) else {
            // Index/registry drift: repair by tearing the remnant down.
            warn!("Waystone {} missing its record; tearing down", hash);
            self.structures.on_break(pos, None);
            return Err(UseError::NoStructure(pos.clone()));
        };

        let config = self.policy.config();
        match actor.held {
            HeldItem::Growth => {
                if record.has_moss_overlay {
                    return Ok(UseOutcome::silent());
                }
                if !actor.creative
                    && !self.adapter.remove_item(&actor.id, &config.growth_item, 1)
                {
                    return Ok(UseOutcome::silent());
                }
                self.structures.set_moss(pos, true);
                return Ok(UseOutcome {
                    open_menu: false,
                    events: vec![WaystoneEvent::MossChanged { hash, mossy: true }],
                });
            }
            HeldItem::Shears => {
                if !record.has_moss_overlay {
                    return Ok(UseOutcome::silent());
                }
                self.structures.set_moss(pos, false);
                self.adapter.scatter_items(
                    &record.position.up_by(2),
                    vec![ItemStack::new(config.growth_item.clone(), 1)],
                );
                return Ok(UseOutcome {
                    open_menu: false,
                    events: vec![WaystoneEvent::MossChanged { hash, mossy: false }],
                });
            }
            // These tags carry their own host-side interactions.
            HeldItem::DiscoveryToken | HeldItem::VoidAnchor | HeldItem::DebugTool => {
                return Ok(UseOutcome::silent());
            }
            HeldItem::None => {}
        }

        if actor.sneaking && self.policy.can_redeem(actor, &record) {
            return Ok(self.redeem_storage(&hash, &record.position));
        }

        let mut events = Vec::new();

        if !self.discovery.contains(&actor.id, &hash) {
            let holdings = self.adapter.count_item(&actor.id, &config.discover_item);
            let cost = match self.policy.discovery(actor, &record, holdings) {
                PolicyDecision::DeniedNoFunds => {
                    return Err(UseError::MissingDiscoveryItem {
                        item: config.discover_item.clone(),
                        amount: config.discover_amount,
                    });
                }
                PolicyDecision::RequiresPayment => {
                    let stack = ItemStack::new(config.discover_item.clone(), config.discover_amount);
                    if !self
                        .adapter
                        .remove_item(&actor.id, &stack.item, stack.count)
                    {
                        return Err(UseError::MissingDiscoveryItem {
                            item: config.discover_item.clone(),
                            amount: config.discover_amount,
                        });
                    }
                    // The payment is held inside the structure until an
                    // operator or the owner redeems it.
                    let paid = stack.clone();
                    self.registry
                        .update(&hash, |r| r.stored_inventory.push(paid));
                    Some(stack)
                }
                _ => None,
            };

            if self.discovery.discover(&actor.id, &hash) {
                events.push(WaystoneEvent::Discovered {
                    player: actor.id.clone(),
                    hash: hash.clone(),
                    name: record.name.clone(),
                    cost,
                });
            }
        }

        if record.owner.is_none() {
            // First non-sneaking interaction claims the waystone, exactly
            // once for the record's lifetime.
            self.registry
                .update(&hash, |r| r.owner = Some(actor.id.clone()));
            events.push(WaystoneEvent::OwnerClaimed {
                hash: hash.clone(),
                owner: actor.id.clone(),
            });
        }

        Ok(UseOutcome {
            open_menu: true,
            events,
        })
    }

    fn redeem_storage(&self, hash: &str, lower: &WorldPos) -> UseOutcome {
        let mut drained = Vec::new();
        self.registry
            .update(hash, |r| drained = r.take_inventory());
        if drained.is_empty() {
            return UseOutcome::silent();
        }
        let drop_pos = lower.up_by(2);
        self.adapter.scatter_items(&drop_pos, drained.clone());
        UseOutcome {
            open_menu: false,
            events: vec![WaystoneEvent::InventoryEjected {
                hash: hash.to_string(),
                position: drop_pos,
                items: drained,
            }],
        }
    }

    // -----------------------------------------------------------------------
    // Travel
    // -----------------------------------------------------------------------

    /// The config-derived default cost policy.
    pub fn travel_cost(&self) -> CostPolicy {
        CostPolicy::from_config(self.policy.config())
    }

    pub fn attempt_travel(
        &self,
        actor: &ActorContext,
        source: &TravelSource,
        destination: &str,
        cost: &CostPolicy,
    ) -> Result<Vec<WaystoneEvent>, TravelError> {
        TravelTransaction {
            registry: &self.registry,
            discovery: &self.discovery,
            policy: &self.policy,
            adapter: self.adapter.as_ref(),
        }
        .attempt(actor, source, destination, cost)
    }

    // -----------------------------------------------------------------------
    // Record administration
    // -----------------------------------------------------------------------

    /// Rename a waystone. Owner or operator only.
    pub fn set_name(
        &self,
        actor: &ActorContext,
        hash: &str,
        name: impl Into<String>,
    ) -> Result<Vec<WaystoneEvent>, UseError> {
        let record = self
            .registry
            .get(hash)
            .ok_or_else(|| UseError::UnknownWaystone(hash.to_string()))?;
        let is_owner = record.owner.as_deref() == Some(actor.id.as_str());
        if !is_owner && !actor.is_op() {
            return Err(UseError::PermissionDenied);
        }
        let name = name.into();
        let event_name = name.clone();
        self.registry.update(hash, |r| r.name = name);
        Ok(vec![WaystoneEvent::NameChanged {
            hash: hash.to_string(),
            name: event_name,
        }])
    }

    /// Toggle the discovery-cost exemption. Operator only.
    pub fn set_global(
        &self,
        actor: &ActorContext,
        hash: &str,
        is_global: bool,
    ) -> Result<Vec<WaystoneEvent>, UseError> {
        if !actor.is_op() {
            return Err(UseError::PermissionDenied);
        }
        if !self.registry.update(hash, |r| r.is_global = is_global) {
            return Err(UseError::UnknownWaystone(hash.to_string()));
        }
        Ok(vec![WaystoneEvent::GlobalChanged {
            hash: hash.to_string(),
            is_global,
        }])
    }

    /// Administrative owner reset, the only path that clears an owner.
    pub fn reset_owner(&self, actor: &ActorContext, hash: &str) -> Result<(), UseError> {
        if !actor.is_op() {
            return Err(UseError::PermissionDenied);
        }
        if !self.registry.update(hash, |r| r.owner = None) {
            return Err(UseError::UnknownWaystone(hash.to_string()));
        }
        info!("Owner of waystone {} reset by {}", hash, actor.id);
        Ok(())
    }

    /// Permanently delete a waystone: tear down any remaining structure,
    /// then drop the hash from every player's discovery set. Returns how
    /// many discovery sets were touched.
    pub fn forget_waystone(&self, hash: &str) -> usize {
        if let Some(record) = self.registry.get(hash) {
            self.structures.on_break(&record.position, None);
        }
        self.discovery.forget_all(hash)
    }
}
