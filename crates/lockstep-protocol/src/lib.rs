//! Round-synchronization protocol for the Lockstep simulation.
//!
//! This crate is the core of the system: the algorithm by which a
//! coordinator and a set of worker units agree -- through nothing but a
//! shared key-value namespace with eventual visibility -- on a stable
//! neighbour topology, a monotonically advancing round counter, a
//! per-round board snapshot, and when it is safe to advance.
//!
//! Every entry point is a pure function of a [`WorldView`] snapshot that
//! returns bag writes plus a status. No state survives between
//! invocations; the entire decision is re-derived from the shared store
//! each time. That property is what makes the protocol safe under
//! arbitrary re-invocation, duplicated delivery, and out-of-order
//! observation of peer writes.
//!
//! # Modules
//!
//! - [`topology`] -- Deterministic square-grid neighbourhood builder.
//! - [`stepper`] -- Per-unit cell logic and the B3/S23 transition rule.
//! - [`aggregator`] -- Coordinator-side round aggregation and advance.
//! - [`lifecycle`] -- The per-unit handler boundary (run vs reset, leader
//!   gating, error-to-status conversion).
//! - [`wire`] -- Application bag keys and scalar wire encodings.
//! - [`error`] -- The protocol error taxonomy.
//!
//! [`WorldView`]: lockstep_types::WorldView

pub mod aggregator;
pub mod error;
pub mod lifecycle;
pub mod stepper;
pub mod topology;
pub mod wire;

// Re-export primary types for convenience.
pub use aggregator::{AggregateOutcome, aggregate};
pub use error::ProtocolError;
pub use lifecycle::{Invocation, RunSettings, UnitContext, handle_invocation};
pub use stepper::{CellOutcome, next_state, step_cell};
pub use topology::build_topology;
