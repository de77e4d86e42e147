//! Engine error types.

use lockstep_store::StoreError;

use crate::config::ConfigError;

/// Errors that can occur while running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be loaded.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The world stopped making progress before reaching its goal.
    /// With every unit hosted locally this means blocked shared state
    /// (the coordinator status says why); in a multi-process deployment
    /// it can also mean a missing peer.
    #[error("no progress after {sweeps} sweeps: {last_status}")]
    Stalled {
        /// Sweeps executed before giving up.
        sweeps: u64,
        /// The last coordinator status observed.
        last_status: String,
    },
}
