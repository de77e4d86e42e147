//! Point-in-time world snapshots and bag write sets.
//!
//! Handlers never touch the store directly: they receive a [`WorldView`]
//! read at invocation time and return a [`WriteSet`] describing the full
//! new contents of their own bag. Deciding the complete output before
//! writing is what keeps partial writes out of the shared state.

use std::collections::BTreeMap;

use crate::identity::UnitId;

/// The writer of a bag: either the coordinator (on behalf of the
/// application) or a single unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Entity {
    /// The application-scoped bag, writable only by the coordinator.
    Application,
    /// A unit's own bag, writable only by that unit.
    Unit(UnitId),
}

/// A point-in-time snapshot of membership and every bag.
///
/// The snapshot is self-consistent from the reader's perspective but may
/// lag any other entity's latest local write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldView {
    /// The application-scoped bag (topology, round, board, run flag).
    pub app: BTreeMap<String, String>,

    /// Each registered unit's bag, keyed by identity.
    pub units: BTreeMap<UnitId, BTreeMap<String, String>>,

    /// The sorted membership list at snapshot time.
    pub members: Vec<UnitId>,
}

impl WorldView {
    /// A unit's bag, or an empty bag if it has published nothing.
    pub fn unit_bag(&self, unit: &UnitId) -> BTreeMap<String, String> {
        self.units.get(unit).cloned().unwrap_or_default()
    }

    /// A value from the application bag, if present.
    pub fn app_value(&self, key: &str) -> Option<&str> {
        self.app.get(key).map(String::as_str)
    }
}

/// The full replacement contents for one entity's bag.
///
/// Applying a write set overwrites the owner's bag wholesale; keys absent
/// from `bag` are removed. This makes every publish idempotent and leaves
/// no partially-updated bag visible to readers of a later snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSet {
    /// The entity whose bag is replaced.
    pub owner: Entity,

    /// The complete new bag contents.
    pub bag: BTreeMap<String, String>,
}

impl WriteSet {
    /// A write set replacing the application bag.
    pub const fn application(bag: BTreeMap<String, String>) -> Self {
        Self {
            owner: Entity::Application,
            bag,
        }
    }

    /// A write set replacing `unit`'s own bag.
    pub const fn unit(unit: UnitId, bag: BTreeMap<String, String>) -> Self {
        Self {
            owner: Entity::Unit(unit),
            bag,
        }
    }
}
