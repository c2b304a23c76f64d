//! Interaction policy: pure permission/cost rule evaluation consumed by
//! discovery, breaking, redemption, and travel. No I/O, no mutation;
//! callers deduct and commit only after a decision comes back clean.

use crate::record::WaystoneRecord;
use crate::types::{ActorContext, BreakPermission, WaystonesConfig};

/// Outcome of a rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Allowed,
    DeniedNoPermission,
    DeniedNoFunds,
    /// Allowed, but the caller must deduct the configured cost first.
    RequiresPayment,
}

pub struct InteractionPolicy {
    config: WaystonesConfig,
}

impl InteractionPolicy {
    pub fn new(config: WaystonesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WaystonesConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Breaking
    // -----------------------------------------------------------------------

    /// Whether the actor may physically break this waystone's structure.
    ///
    /// World-generated structures can be configured unbreakable (creative
    /// actors excepted); otherwise the four-tier permission ladder
    /// applies. Owner-only admits the owner, an unclaimed record, or an
    /// operator.
    pub fn can_break(&self, actor: &ActorContext, record: &WaystoneRecord) -> PolicyDecision {
        if self.config.unbreakable_generated && record.is_world_generated && !actor.creative {
            return PolicyDecision::DeniedNoPermission;
        }
        match self.config.break_permission {
            BreakPermission::Anyone => PolicyDecision::Allowed,
            BreakPermission::OwnerOnly => match &record.owner {
                Some(owner) if *owner != actor.id && !actor.is_op() => {
                    PolicyDecision::DeniedNoPermission
                }
                _ => PolicyDecision::Allowed,
            },
            BreakPermission::OpOnly => {
                if actor.is_op() {
                    PolicyDecision::Allowed
                } else {
                    PolicyDecision::DeniedNoPermission
                }
            }
            BreakPermission::Nobody => PolicyDecision::DeniedNoPermission,
        }
    }

    // -----------------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------------

    /// Whether the actor may discover this waystone, given how many of the
    /// configured discovery item they hold.
    pub fn discovery(
        &self,
        actor: &ActorContext,
        record: &WaystoneRecord,
        holdings: u32,
    ) -> PolicyDecision {
        if record.is_global || actor.creative || !self.config.has_discover_cost() {
            return PolicyDecision::Allowed;
        }
        if holdings >= self.config.discover_amount {
            PolicyDecision::RequiresPayment
        } else {
            PolicyDecision::DeniedNoFunds
        }
    }

    // -----------------------------------------------------------------------
    // Redemption
    // -----------------------------------------------------------------------

    /// Whether the actor may withdraw the payments stored in the
    /// structure: operators always, the owner only when configured.
    pub fn can_redeem(&self, actor: &ActorContext, record: &WaystoneRecord) -> bool {
        actor.is_op()
            || (self.config.owners_redeem_payments
                && record.owner.as_deref() == Some(actor.id.as_str()))
    }

    // -----------------------------------------------------------------------
    // Travel
    // -----------------------------------------------------------------------

    /// Travel permission gate: global destinations and operators are
    /// always admitted, everyone else must have discovered the hash.
    pub fn travel(
        &self,
        actor: &ActorContext,
        record: &WaystoneRecord,
        discovered: bool,
    ) -> PolicyDecision {
        if record.is_global || discovered || actor.is_op() {
            PolicyDecision::Allowed
        } else {
            PolicyDecision::DeniedNoPermission
        }
    }
}
