//! Travel transaction: validate, charge, relocate, all or nothing.
//!
//! Every failure aborts with no mutation: no partial cost deduction, no
//! position change. Once the commit step starts (deduction) the
//! transaction cannot be cancelled; side effects (events) are produced
//! only after the position change lands.

use crate::discovery::DiscoveryIndex;
use crate::events::WaystoneEvent;
use crate::policy::{InteractionPolicy, PolicyDecision};
use crate::registry::WaystoneRegistry;
use crate::types::{ActorContext, WaystoneHash, WorldPos};
use crate::world::WorldAdapter;
use log::debug;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Where the travel request originated. Carried for notification and
/// auditing; a stale source (waystone destroyed mid-menu) never blocks
/// travel to a live destination.
#[derive(Debug, Clone, PartialEq)]
pub enum TravelSource {
    Waystone(WaystoneHash),
    VoidAnchor(String),
    /// Operator / command initiated.
    Command,
}

/// What a teleport costs the travelling actor.
#[derive(Debug, Clone, PartialEq)]
pub enum CostPolicy {
    Free,
    Item { item: String, amount: u32 },
}

impl CostPolicy {
    /// The config-derived default policy.
    pub fn from_config(config: &crate::types::WaystonesConfig) -> Self {
        if config.cost_item.is_empty() || config.cost_amount == 0 {
            CostPolicy::Free
        } else {
            CostPolicy::Item {
                item: config.cost_item.clone(),
                amount: config.cost_amount,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TravelError {
    /// Destination hash resolves to neither a registry record nor one of
    /// the actor's void anchors (the destroyed-since-discovery case).
    #[error("destination waystone does not exist")]
    DestinationNotFound,

    #[error("travel to this destination is not permitted")]
    PermissionDenied,

    #[error("travel requires {amount} {item}")]
    InsufficientFunds { item: String, amount: u32 },

    /// The host no longer tracks the actor; nothing to relocate.
    #[error("actor {0} has no position")]
    ActorNotFound(String),
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// One travel attempt over borrowed core state. Construct, call
/// [`TravelTransaction::attempt`], drop.
pub struct TravelTransaction<'a> {
    pub registry: &'a WaystoneRegistry,
    pub discovery: &'a DiscoveryIndex,
    pub policy: &'a InteractionPolicy,
    pub adapter: &'a dyn WorldAdapter,
}

impl<'a> TravelTransaction<'a> {
    /// Validate and commit a teleport of `actor` to `destination`.
    ///
    /// Checks run in a fixed order (resolution, permission, funds) and
    /// the commit (deduct, then relocate) only starts once all pass.
    pub fn attempt(
        &self,
        actor: &ActorContext,
        source: &TravelSource,
        destination: &str,
        cost: &CostPolicy,
    ) -> Result<Vec<WaystoneEvent>, TravelError> {
        // 1. Resolve: registry first, then the actor's own void anchors.
        let target: WorldPos = match self.registry.get(destination) {
            Some(record) => {
                // 2. Permission.
                let discovered = self.discovery.contains(&actor.id, destination);
                if self.policy.travel(actor, &record, discovered) != PolicyDecision::Allowed {
                    return Err(TravelError::PermissionDenied);
                }
                record.position.clone()
            }
            None => match self.discovery.void_anchor(&actor.id, destination) {
                // Void anchors are owner-scoped, so resolution is consent.
                Some(anchor) => anchor.position,
                None => return Err(TravelError::DestinationNotFound),
            },
        };

        // 3. Funds, checked before any mutation.
        if let CostPolicy::Item { item, amount } = cost {
            if !actor.creative && *amount > 0 {
                if self.adapter.count_item(&actor.id, item) < *amount {
                    return Err(TravelError::InsufficientFunds {
                        item: item.clone(),
                        amount: *amount,
                    });
                }
            }
        }

        // The actor must still exist before the commit starts.
        if self.adapter.actor_position(&actor.id).is_none() {
            return Err(TravelError::ActorNotFound(actor.id.clone()));
        }

        // 4. Commit: deduct, then relocate. `remove_item` is
        // all-or-nothing, so a racing holdings change surfaces as a clean
        // abort rather than a partial charge.
        if let CostPolicy::Item { item, amount } = cost {
            if !actor.creative && *amount > 0 {
                if !self.adapter.remove_item(&actor.id, item, *amount) {
                    return Err(TravelError::InsufficientFunds {
                        item: item.clone(),
                        amount: *amount,
                    });
                }
            }
        }
        self.adapter.set_actor_position(&actor.id, &target);

        // 5. Post-commit side effects only.
        debug!(
            "{} travelled to {} ({:?} → {})",
            actor.id, destination, source, target
        );
        Ok(vec![WaystoneEvent::Travelled {
            player: actor.id.clone(),
            hash: destination.to_string(),
            position: target,
        }])
    }
}
