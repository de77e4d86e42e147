//! Engine binary for the Lockstep simulation.
//!
//! Hosts a population of logical units over a shared relation store and
//! drives them through the reset protocol and a bounded number of
//! synchronized rounds. The units never talk to each other -- every bit
//! of coordination flows through the store, exactly as it would with one
//! process per unit.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lockstep-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect the store backend (in-memory or Redis-compatible)
//! 4. Register the hosted units
//! 5. Drive the reset phase until the board settles on the pattern
//! 6. Flip the run flag and advance the configured number of rounds
//! 7. Log the result

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lockstep_engine::config::{EngineConfig, StoreBackend};
use lockstep_engine::driver::Driver;
use lockstep_engine::error::EngineError;
use lockstep_protocol::lifecycle::{RunSettings, default_pattern};
use lockstep_store::{MemoryStore, RedisStore, RelationStore};
use lockstep_types::UnitId;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("lockstep-engine starting");
    info!(
        unit_count = config.world.unit_count,
        rounds = config.world.rounds,
        backend = ?config.store.backend,
        "Configuration loaded"
    );

    // 3. Connect the store backend.
    let store: Arc<dyn RelationStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.store.url).await?),
    };

    // 4. Register the hosted units.
    let units: Vec<UnitId> = (0..config.world.unit_count)
        .map(|i| UnitId::new(format!("{}/{i:03}", config.world.unit_prefix)))
        .collect();
    let driver = Driver::new(
        store,
        units,
        Duration::from_millis(config.simulation.sweep_interval_ms),
    );
    driver.register_all().await?;
    info!(units = driver.units().len(), "Units registered");

    // 5. Reset phase: drive the board to the initial pattern.
    let init = if config.simulation.init.is_empty() {
        default_pattern()
    } else {
        config.simulation.init.clone()
    };
    let reset = driver
        .run_until_settled(
            &RunSettings {
                run: false,
                init: init.clone(),
            },
            config.simulation.max_sweeps,
        )
        .await?;
    if !reset.app_status.is_active() {
        return Err(Box::new(EngineError::Stalled {
            sweeps: 0,
            last_status: reset.app_status.to_string(),
        }) as Box<dyn std::error::Error>);
    }
    info!(status = %reset.app_status, "Reset phase settled");

    // 6. Run phase: advance the configured number of rounds.
    let outcome = driver
        .run_rounds(
            &RunSettings { run: true, init },
            config.world.rounds,
            config.simulation.max_sweeps,
        )
        .await?;

    // 7. Log the result.
    info!(
        round = outcome.round,
        board = outcome.board.as_deref().unwrap_or(""),
        "Run complete"
    );
    Ok(())
}

/// Load `lockstep-config.yaml` from the working directory, falling back
/// to defaults when the file does not exist.
fn load_config() -> Result<EngineConfig, EngineError> {
    let path = Path::new("lockstep-config.yaml");
    if path.exists() {
        EngineConfig::from_file(path).map_err(EngineError::from)
    } else {
        Ok(EngineConfig::default())
    }
}
