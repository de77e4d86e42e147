//! In-process store backend for tests and local simulation.
//!
//! Holds all bags behind one `RwLock` and publishes version bumps on a
//! `watch` channel so a local driver can sleep until something actually
//! changes. Visibility is immediate here -- stronger than the contract
//! requires -- which is fine: the protocol must tolerate staleness, not
//! depend on it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lockstep_types::{Entity, UnitId, WorldView, WriteSet};
use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::RelationStore;
use crate::error::StoreError;

/// The bags and membership guarded by the store lock.
#[derive(Debug, Default)]
struct MemoryInner {
    /// The application-scoped bag.
    app: BTreeMap<String, String>,
    /// Each registered unit's bag.
    units: BTreeMap<UnitId, BTreeMap<String, String>>,
    /// Change counter, bumped per effective write.
    version: u64,
}

/// An in-memory [`RelationStore`].
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    changes: watch::Sender<u64>,
}

impl MemoryStore {
    /// Create an empty store at version 0.
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: RwLock::new(MemoryInner::default()),
            changes,
        }
    }

    /// Subscribe to version bumps.
    ///
    /// The receiver yields the new version after every effective write;
    /// a driver can await it instead of polling.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Bump the version and notify watchers. Callers hold the write lock.
    fn mark_changed(&self, inner: &mut MemoryInner) {
        inner.version = inner.version.saturating_add(1);
        let _ = self.changes.send(inner.version);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn register_unit(&self, unit: &UnitId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.units.contains_key(unit) {
            return Ok(());
        }
        inner.units.insert(unit.clone(), BTreeMap::new());
        debug!(unit = %unit, "unit registered");
        self.mark_changed(&mut inner);
        Ok(())
    }

    async fn deregister_unit(&self, unit: &UnitId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.units.remove(unit).is_none() {
            return Ok(());
        }
        debug!(unit = %unit, "unit departed");
        self.mark_changed(&mut inner);
        Ok(())
    }

    async fn snapshot(&self) -> Result<WorldView, StoreError> {
        let inner = self.inner.read().await;
        Ok(WorldView {
            app: inner.app.clone(),
            units: inner.units.clone(),
            members: inner.units.keys().cloned().collect(),
        })
    }

    async fn apply(&self, writes: &WriteSet) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        match &writes.owner {
            Entity::Application => {
                if inner.app == writes.bag {
                    return Ok(());
                }
                inner.app = writes.bag.clone();
            }
            Entity::Unit(unit) => {
                let bag = inner
                    .units
                    .get_mut(unit)
                    .ok_or_else(|| StoreError::UnknownUnit(unit.clone()))?;
                if *bag == writes.bag {
                    return Ok(());
                }
                *bag = writes.bag.clone();
            }
        }
        self.mark_changed(&mut inner);
        Ok(())
    }

    async fn version(&self) -> Result<u64, StoreError> {
        Ok(self.inner.read().await.version)
    }
}
