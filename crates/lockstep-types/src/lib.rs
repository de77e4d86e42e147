//! Shared type definitions for the Lockstep simulation.
//!
//! Every value that crosses the shared relation store has a typed
//! representation here: unit identities, cell states, board snapshots,
//! per-unit report caches, and the topology map. The wire encodings match
//! the store's string-keyed string-valued bags exactly, so parsing and
//! rendering live next to the types themselves.
//!
//! # Modules
//!
//! - [`identity`] -- Opaque, totally-ordered unit identities.
//! - [`cell`] -- Cell states and fixed-length board snapshots.
//! - [`report`] -- A unit's sparse round-to-value report cache.
//! - [`topology`] -- The neighbour-adjacency map derived from identities.
//! - [`view`] -- Point-in-time world snapshots and bag write sets.
//! - [`status`] -- Handler status values with their display strings.
//! - [`error`] -- Wire parse errors.

pub mod cell;
pub mod error;
pub mod identity;
pub mod report;
pub mod status;
pub mod topology;
pub mod view;

// Re-export primary types for convenience.
pub use cell::{Board, CellState};
pub use error::ParseError;
pub use identity::UnitId;
pub use report::ReportMap;
pub use status::Status;
pub use topology::Topology;
pub use view::{Entity, WorldView, WriteSet};
