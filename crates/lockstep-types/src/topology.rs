//! The neighbour-adjacency map derived from unit identities.
//!
//! The topology assigns every seated member its neighbour set. It is
//! published by the coordinator as a JSON object of identity to identity
//! list, and its key order -- lexicographic, because the underlying map is
//! ordered -- doubles as the board index order: a unit's position in the
//! key sequence is its cell index on the board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::identity::UnitId;

/// Mapping from each seated unit to its ordered list of neighbours.
///
/// Invariants, guaranteed by the builder and relied on by every reader:
/// the key set is exactly the seated member set (a perfect square count),
/// neighbour lists are sorted, and the relation is symmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topology(BTreeMap<UnitId, Vec<UnitId>>);

impl Topology {
    /// Wrap a prebuilt adjacency map.
    pub const fn from_map(map: BTreeMap<UnitId, Vec<UnitId>>) -> Self {
        Self(map)
    }

    /// Decode a topology from its published JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidTopology`] if the JSON does not decode
    /// as an identity-to-identity-list object.
    pub fn from_wire(raw: &str) -> Result<Self, ParseError> {
        serde_json::from_str(raw).map_err(|e| ParseError::InvalidTopology(e.to_string()))
    }

    /// Render the topology to its published JSON form.
    ///
    /// Key order is the sorted member order; two coordinators observing
    /// the same member set publish byte-identical topologies.
    pub fn to_wire(&self) -> String {
        // Serializing a map of strings to string lists cannot fail.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Number of seated cells.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the topology seats no cells.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `unit` is seated.
    pub fn contains(&self, unit: &UnitId) -> bool {
        self.0.contains_key(unit)
    }

    /// The board index of `unit`: its position in key order.
    pub fn position_of(&self, unit: &UnitId) -> Option<usize> {
        self.0.keys().position(|u| u == unit)
    }

    /// The sorted neighbour list of `unit`, if seated.
    pub fn neighbours(&self, unit: &UnitId) -> Option<&[UnitId]> {
        self.0.get(unit).map(Vec::as_slice)
    }

    /// Seated members in board-index order.
    pub fn members(&self) -> impl Iterator<Item = &UnitId> {
        self.0.keys()
    }

    /// Iterate over `(member, neighbours)` pairs in board-index order.
    pub fn entries(&self) -> impl Iterator<Item = (&UnitId, &[UnitId])> {
        self.0.iter().map(|(u, n)| (u, n.as_slice()))
    }
}
