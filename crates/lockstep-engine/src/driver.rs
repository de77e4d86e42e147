//! The reactive invocation driver.
//!
//! The driver stands in for the external event-delivery mechanism: it
//! re-invokes every hosted unit against a fresh snapshot whenever the
//! store's change version moves. Invocation order rotates from sweep to
//! sweep and units are happily re-invoked when nothing relevant changed
//! -- the protocol guarantees both are harmless, and the driver leans on
//! that instead of tracking which unit needs which change.
//!
//! A sweep only counts as progress if it moved the store version.
//! Because identical republishes are not changes, a converged world goes
//! quiet on its own: the reset loop runs until a sweep changes nothing,
//! and the round loop runs until the published round reaches its goal.

use std::sync::Arc;
use std::time::Duration;

use lockstep_protocol::lifecycle::{RunSettings, UnitContext, handle_invocation};
use lockstep_protocol::wire;
use lockstep_store::RelationStore;
use lockstep_types::{Status, UnitId};
use tracing::{debug, info};

use crate::error::EngineError;

/// Hosts a population of logical units over one shared store.
pub struct Driver {
    store: Arc<dyn RelationStore>,
    units: Vec<UnitId>,
    leader: UnitId,
    sweep_interval: Duration,
}

/// What the store said after a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutcome {
    /// The coordinator status from this sweep's leader invocation.
    pub app_status: Status,

    /// The published round, if the coordinator has published one.
    pub round: Option<u64>,

    /// The published board, if the coordinator has published one.
    pub board: Option<String>,
}

impl Driver {
    /// Create a driver hosting `units` over `store`.
    ///
    /// The first unit in sorted order is the leader; leadership election
    /// proper is a collaborator concern, and "lowest identity leads" is
    /// the driver's stand-in for it.
    pub fn new(store: Arc<dyn RelationStore>, mut units: Vec<UnitId>, sweep_interval: Duration) -> Self {
        units.sort();
        let leader = units.first().cloned().unwrap_or_else(|| UnitId::new("cell/0"));
        Self {
            store,
            units,
            leader,
            sweep_interval,
        }
    }

    /// The hosted unit identities, sorted.
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    /// Register every hosted unit with the store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if a registration write fails.
    pub async fn register_all(&self) -> Result<(), EngineError> {
        for unit in &self.units {
            self.store.register_unit(unit).await?;
        }
        Ok(())
    }

    /// Invoke every unit once, each against a fresh snapshot.
    ///
    /// `rotation` offsets the invocation order so that consecutive
    /// sweeps exercise different interleavings.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if a snapshot or write fails.
    pub async fn sweep(&self, settings: &RunSettings, rotation: usize) -> Result<SweepOutcome, EngineError> {
        let mut app_status = Status::Waiting("no leader invocation yet".to_owned());

        let count = self.units.len().max(1);
        for offset in 0..self.units.len() {
            let index = offset
                .checked_add(rotation)
                .map_or(offset, |i| i.checked_rem(count).unwrap_or(0));
            let Some(unit) = self.units.get(index) else {
                continue;
            };

            let view = self.store.snapshot().await?;
            let ctx = UnitContext {
                unit: unit.clone(),
                is_leader: *unit == self.leader,
                settings: settings.clone(),
            };
            let invocation = handle_invocation(&view, &ctx);

            for writes in &invocation.writes {
                self.store.apply(writes).await?;
            }

            debug!(unit = %unit, status = %invocation.unit_status, "unit invoked");
            if let Some(status) = invocation.app_status {
                info!("{}", status.message());
                app_status = status;
            }
        }

        let view = self.store.snapshot().await?;
        let round = view
            .app_value(wire::ROUND)
            .and_then(|raw| wire::decode_round(raw).ok());
        let board = view.app_value(wire::BOARD).map(str::to_owned);

        Ok(SweepOutcome {
            app_status,
            round,
            board,
        })
    }

    /// Sweep until a whole sweep changes nothing, i.e. the world has
    /// converged for the given settings. Used for the reset phase.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stalled`] if the bound is hit while the
    /// store is still churning, or [`EngineError::Store`] on I/O failure.
    pub async fn run_until_settled(
        &self,
        settings: &RunSettings,
        max_sweeps: u64,
    ) -> Result<SweepOutcome, EngineError> {
        let mut last = None;
        for sweep in 0..max_sweeps {
            let before = self.store.version().await?;
            let rotation = usize::try_from(sweep).unwrap_or(0);
            let outcome = self.sweep(settings, rotation).await?;
            let after = self.store.version().await?;

            if before == after {
                debug!(sweeps = sweep, "world settled");
                return Ok(outcome);
            }
            last = Some(outcome);
            self.pace().await;
        }

        Err(EngineError::Stalled {
            sweeps: max_sweeps,
            last_status: last.map_or_else(String::new, |o| o.app_status.to_string()),
        })
    }

    /// Sweep until the published round reaches `goal`. Used for the run
    /// phase: the world never settles on its own while running.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stalled`] if a sweep makes no progress and
    /// the goal is still ahead, or [`EngineError::Store`] on I/O failure.
    pub async fn run_rounds(
        &self,
        settings: &RunSettings,
        goal: u64,
        max_sweeps: u64,
    ) -> Result<SweepOutcome, EngineError> {
        let mut last_status = String::new();
        for sweep in 0..max_sweeps {
            let before = self.store.version().await?;
            let rotation = usize::try_from(sweep).unwrap_or(0);
            let outcome = self.sweep(settings, rotation).await?;
            let after = self.store.version().await?;

            if outcome.round.is_some_and(|round| round >= goal) {
                return Ok(outcome);
            }
            if before == after {
                // Nothing moved and the goal is still ahead: blocked.
                return Err(EngineError::Stalled {
                    sweeps: sweep,
                    last_status: outcome.app_status.to_string(),
                });
            }
            last_status = outcome.app_status.to_string();
            self.pace().await;
        }

        Err(EngineError::Stalled {
            sweeps: max_sweeps,
            last_status,
        })
    }

    /// Sleep the configured sweep interval, if any.
    async fn pace(&self) {
        if !self.sweep_interval.is_zero() {
            tokio::time::sleep(self.sweep_interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lockstep_store::MemoryStore;

    use super::*;

    fn units(n: usize) -> Vec<UnitId> {
        (0..n).map(|i| UnitId::new(format!("cell/{i:02}"))).collect()
    }

    fn driver(n: usize) -> Driver {
        Driver::new(Arc::new(MemoryStore::new()), units(n), Duration::ZERO)
    }

    fn settings(run: bool, init: &str) -> RunSettings {
        RunSettings {
            run,
            init: init.to_owned(),
        }
    }

    #[tokio::test]
    async fn reset_converges_to_the_initial_pattern() {
        let driver = driver(9);
        driver.register_all().await.unwrap();

        let outcome = driver
            .run_until_settled(&settings(false, "000111000"), 100)
            .await
            .unwrap();

        assert_eq!(outcome.round, Some(0));
        assert_eq!(outcome.board.as_deref(), Some("000111000"));
        assert_eq!(
            outcome.app_status,
            Status::Active("Reset [000111000]".to_owned())
        );
    }

    #[tokio::test]
    async fn run_phase_advances_rounds() {
        let driver = driver(9);
        driver.register_all().await.unwrap();

        driver
            .run_until_settled(&settings(false, "000111000"), 100)
            .await
            .unwrap();

        let outcome = driver
            .run_rounds(&settings(true, "000111000"), 1, 100)
            .await
            .unwrap();
        assert_eq!(outcome.round, Some(1));
        assert_eq!(outcome.board.as_deref(), Some("010010010"));
    }

    #[tokio::test]
    async fn undersized_pattern_settles_blocked() {
        let driver = driver(9);
        driver.register_all().await.unwrap();

        // The aggregator blocks before publishing anything, the units
        // wait on the missing coordinator data, and nothing ever
        // changes: the world is settled, in a blocked state that only
        // an external fix (a bigger pattern) can resolve.
        let outcome = driver
            .run_until_settled(&settings(false, "0101"), 100)
            .await
            .unwrap();
        assert!(outcome.app_status.is_blocked());
        assert!(outcome.app_status.message().contains("pattern too small"));
        assert_eq!(outcome.round, None);
    }
}
