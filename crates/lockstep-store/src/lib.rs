//! Shared relation store for the Lockstep simulation.
//!
//! The store is the only channel between units: per-entity string-keyed
//! bags of string values, one application-scoped bag owned by the
//! coordinator and one bag per unit owned by that unit alone. Writes are
//! locally immediate and eventually visible to every reader; there are no
//! cross-bag transactions.
//!
//! # Ownership
//!
//! Exclusive-write ownership is modeled in the API rather than trusted to
//! callers: a [`WriteSet`] names its owning entity and replaces only that
//! entity's bag. A handler therefore cannot express a write to someone
//! else's bag.
//!
//! # Change tracking
//!
//! Every effective write bumps a monotonic version counter; rewriting a
//! bag with identical contents is a no-op and does not bump it. The
//! driver re-invokes handlers when it observes the version move, so
//! idempotent republishes quiesce instead of looping.
//!
//! # Modules
//!
//! - [`memory`] -- In-process backend for tests and local simulation.
//! - [`redis`] -- Redis-compatible backend (`fred`), one JSON value per bag.
//! - [`error`] -- Shared error types.
//!
//! The snapshot and write-set types ([`WorldView`], [`WriteSet`],
//! [`Entity`]) live in `lockstep-types` so that protocol code can stay
//! free of any backend dependency; they are re-exported here.

pub mod error;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use lockstep_types::UnitId;

pub use error::StoreError;
pub use lockstep_types::{Entity, WorldView, WriteSet};
pub use memory::MemoryStore;
pub use redis::RedisStore;

/// A shared relation store holding the world's bags and membership.
///
/// Implementations provide eventual visibility only: a [`snapshot`] may
/// lag behind another entity's latest write. Handlers must re-derive
/// their full output from whatever snapshot they are given.
///
/// [`snapshot`]: RelationStore::snapshot
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Add a unit to the membership set, creating its (empty) bag.
    ///
    /// Registering an already-known unit is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails.
    async fn register_unit(&self, unit: &UnitId) -> Result<(), StoreError>;

    /// Remove a unit and its bag from the world.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend write fails.
    async fn deregister_unit(&self, unit: &UnitId) -> Result<(), StoreError>;

    /// Read a point-in-time snapshot of membership and every bag.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn snapshot(&self) -> Result<WorldView, StoreError>;

    /// Replace the owner's bag with the contents of `writes`.
    ///
    /// A write identical to the current bag contents is a no-op and does
    /// not count as a change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownUnit`] if the owner is an
    /// unregistered unit, or a backend error if the write fails.
    async fn apply(&self, writes: &WriteSet) -> Result<(), StoreError>;

    /// The current change version (monotonic, bumped per effective write).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    async fn version(&self) -> Result<u64, StoreError>;
}
