//! Redis-compatible store backend.
//!
//! Each bag is stored as one JSON object value, membership as a set, and
//! the change counter as an integer. Key patterns:
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `world:app` | JSON | The application-scoped bag |
//! | `world:unit:{id}` | JSON | One unit's bag |
//! | `world:members` | Set | Registered unit identities |
//! | `world:version` | Integer | Change counter |
//!
//! Writes here are not transactional across keys; the protocol is
//! designed for that (readers tolerate any interleaving of bag states).

use std::collections::BTreeMap;

use async_trait::async_trait;
use fred::prelude::*;
use lockstep_types::{Entity, UnitId, WorldView, WriteSet};
use tracing::debug;

use crate::RelationStore;
use crate::error::StoreError;

/// The application bag key.
const APP_KEY: &str = "world:app";

/// The membership set key.
const MEMBERS_KEY: &str = "world:members";

/// The change counter key.
const VERSION_KEY: &str = "world:version";

/// Key of a unit's bag.
fn unit_key(unit: &UnitId) -> String {
    format!("world:unit:{unit}")
}

/// Connection handle to a Redis-compatible instance backing the store.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
}

impl RedisStore {
    /// Connect to the backend at the given URL.
    ///
    /// The URL follows the Redis URL scheme: `redis://host:port` or
    /// `redis://host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed, or
    /// [`StoreError::Backend`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid store URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to relation store backend");
        Ok(Self { client })
    }

    /// Read a bag stored as a JSON object, or an empty bag if unset.
    async fn get_bag(&self, key: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let value: Option<String> = self.client.get(key).await?;
        value.map_or_else(|| Ok(BTreeMap::new()), |s| Ok(serde_json::from_str(&s)?))
    }

    /// Overwrite a bag with the given contents.
    async fn set_bag(
        &self,
        key: &str,
        bag: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(bag)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Bump the change counter.
    async fn bump_version(&self) -> Result<(), StoreError> {
        let _: i64 = self.client.incr(VERSION_KEY).await?;
        Ok(())
    }

    /// Flush all keys from the backend.
    ///
    /// **WARNING:** This deletes all data. Only use for testing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the flush fails.
    pub async fn flush_all(&self) -> Result<(), StoreError> {
        let _: () = self.client.flushall(false).await?;
        Ok(())
    }
}

#[async_trait]
impl RelationStore for RedisStore {
    async fn register_unit(&self, unit: &UnitId) -> Result<(), StoreError> {
        let added: u32 = self.client.sadd(MEMBERS_KEY, unit.as_str()).await?;
        if added == 0 {
            return Ok(());
        }
        self.set_bag(&unit_key(unit), &BTreeMap::new()).await?;
        debug!(unit = %unit, "unit registered");
        self.bump_version().await
    }

    async fn deregister_unit(&self, unit: &UnitId) -> Result<(), StoreError> {
        let removed: u32 = self.client.srem(MEMBERS_KEY, unit.as_str()).await?;
        if removed == 0 {
            return Ok(());
        }
        let _: u32 = self.client.del(unit_key(unit).as_str()).await?;
        debug!(unit = %unit, "unit departed");
        self.bump_version().await
    }

    async fn snapshot(&self) -> Result<WorldView, StoreError> {
        let raw_members: Vec<String> = self.client.smembers(MEMBERS_KEY).await?;
        let mut members: Vec<UnitId> = raw_members.into_iter().map(UnitId::from).collect();
        members.sort();

        let app = self.get_bag(APP_KEY).await?;
        let mut units = BTreeMap::new();
        for member in &members {
            let bag = self.get_bag(&unit_key(member)).await?;
            units.insert(member.clone(), bag);
        }

        Ok(WorldView { app, units, members })
    }

    async fn apply(&self, writes: &WriteSet) -> Result<(), StoreError> {
        let key = match &writes.owner {
            Entity::Application => APP_KEY.to_owned(),
            Entity::Unit(unit) => {
                let known: bool = self.client.sismember(MEMBERS_KEY, unit.as_str()).await?;
                if !known {
                    return Err(StoreError::UnknownUnit(unit.clone()));
                }
                unit_key(unit)
            }
        };

        let current = self.get_bag(&key).await?;
        if current == writes.bag {
            return Ok(());
        }
        self.set_bag(&key, &writes.bag).await?;
        self.bump_version().await
    }

    async fn version(&self) -> Result<u64, StoreError> {
        let value: Option<String> = self.client.get(VERSION_KEY).await?;
        value.map_or(Ok(0), |s| {
            s.parse::<u64>()
                .map_err(|e| StoreError::Config(format!("{VERSION_KEY} is not a valid u64: {e}")))
        })
    }
}
