//! Core waystone types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable registry key of a waystone (MD5 hex digest, see [`crate::record`]).
pub type WaystoneHash = String;

/// Identity of a player or other actor as assigned by the host.
pub type ActorId = String;

// ---------------------------------------------------------------------------
// World positions
// ---------------------------------------------------------------------------

/// A block coordinate plus the world/dimension it lives in.
///
/// Waystone records always store the coordinates of the structure's
/// **lower** half; the upper half is derived via [`WorldPos::up`].
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub world: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    pub fn new(world: impl Into<String>, x: i32, y: i32, z: i32) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// The cell directly above this one, same world.
    pub fn up(&self) -> Self {
        self.up_by(1)
    }

    /// The cell directly below this one, same world.
    pub fn down(&self) -> Self {
        self.up_by(-1)
    }

    /// The cell `n` above this one, used for scatter/eject positions.
    pub fn up_by(&self, n: i32) -> Self {
        Self {
            world: self.world.clone(),
            x: self.x,
            y: self.y + n,
            z: self.z,
        }
    }
}

impl std::fmt::Display for WorldPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{},{},{}]", self.world, self.x, self.y, self.z)
    }
}

/// Horizontal orientation of a placed structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    #[default]
    North,
    South,
    East,
    West,
}

// ---------------------------------------------------------------------------
// Items & actors
// ---------------------------------------------------------------------------

/// A stack of host-defined items. The core never interprets item ids
/// beyond equality with configured cost items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }
}

/// Capability tag of whatever the actor is holding during an interaction.
///
/// The host maps its concrete item types onto these tags; the core
/// dispatches on the tag alone and never inspects item internals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeldItem {
    #[default]
    None,
    DiscoveryToken,
    VoidAnchor,
    DebugTool,
    Shears,
    Growth,
}

/// Snapshot of the interacting actor, captured by the host at the moment
/// of the interaction.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub id: ActorId,
    /// Host permission level; 2+ is treated as operator.
    pub op_level: u8,
    pub creative: bool,
    pub sneaking: bool,
    pub held: HeldItem,
}

impl ActorContext {
    pub fn new(id: impl Into<ActorId>) -> Self {
        Self {
            id: id.into(),
            op_level: 0,
            creative: false,
            sneaking: false,
            held: HeldItem::None,
        }
    }

    pub fn is_op(&self) -> bool {
        self.op_level >= 2
    }
}

// ---------------------------------------------------------------------------
// Rules & config
// ---------------------------------------------------------------------------

/// Who may physically break a waystone structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPermission {
    Anyone,
    OwnerOnly,
    OpOnly,
    Nobody,
}

/// Runtime rule set, loadable from a TOML file with a `WAYSTONES_*`
/// environment overlay (see [`WaystonesConfig::load`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaystonesConfig {
    /// Item consumed when discovering a non-global waystone. An empty
    /// string or a zero amount means discovery is free.
    pub discover_item: String,
    pub discover_amount: u32,
    /// Item consumed per teleport under the config-derived cost policy.
    pub cost_item: String,
    pub cost_amount: u32,
    pub break_permission: BreakPermission,
    /// Whether owners (not just operators) may withdraw stored payments.
    pub owners_redeem_payments: bool,
    /// Whether a sneak-break preserves the record inside the dropped item.
    pub store_data_on_sneak_break: bool,
    /// Whether world-generated waystones resist breaking entirely.
    pub unbreakable_generated: bool,
    /// Item that applies the moss overlay (and drops when sheared off).
    pub growth_item: String,
    /// Host autosave interval in seconds (`waystones-host --watch`).
    pub autosave_secs: u64,
}

impl Default for WaystonesConfig {
    fn default() -> Self {
        Self {
            discover_item: String::new(),
            discover_amount: 0,
            cost_item: String::new(),
            cost_amount: 0,
            break_permission: BreakPermission::Anyone,
            owners_redeem_payments: false,
            store_data_on_sneak_break: true,
            unbreakable_generated: false,
            growth_item: "vine".to_string(),
            autosave_secs: 60,
        }
    }
}

impl WaystonesConfig {
    /// Layer an optional TOML file under `WAYSTONES_*` environment
    /// variables. A missing file and missing keys fall back to defaults.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix("WAYSTONES").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Whether a discovery cost is configured at all.
    pub fn has_discover_cost(&self) -> bool {
        !self.discover_item.is_empty() && self.discover_amount > 0
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaystoneStats {
    pub registered: usize,
    pub global: usize,
    pub tracked_players: usize,
    pub void_anchors: usize,
}
