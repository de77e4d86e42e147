//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `lockstep-config.yaml` at the
//! project root. This module defines strongly-typed structs mirroring the
//! YAML structure and a loader that reads and validates the file. A
//! missing file is not an error: every field has a default, and the
//! 9-unit blinker world the defaults describe is the standard demo.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `lockstep-config.yaml`. All fields have
/// defaults describing a 9-unit in-memory blinker world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// World-level settings (unit population, rounds to run).
    #[serde(default)]
    pub world: WorldConfig,

    /// Store backend settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Simulation settings (initial pattern, sweep bounds).
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for infrastructure:
    /// `LOCKSTEP_STORE_URL` overrides `store.url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.store.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.store.apply_env_overrides();
        Ok(config)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Identity prefix for locally hosted units (`<prefix>/<nn>`).
    #[serde(default = "default_unit_prefix")]
    pub unit_prefix: String,

    /// Number of units to host.
    #[serde(default = "default_unit_count")]
    pub unit_count: usize,

    /// Number of rounds to advance after the reset converges.
    #[serde(default = "default_rounds")]
    pub rounds: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            unit_prefix: default_unit_prefix(),
            unit_count: default_unit_count(),
            rounds: default_rounds(),
        }
    }
}

/// Store backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend selection: `memory` or `redis`.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Redis-compatible URL (only used by the `redis` backend).
    #[serde(default = "default_store_url")]
    pub url: String,
}

impl StoreConfig {
    /// Override store settings with environment variables when set.
    ///
    /// This allows Docker Compose (or any deployment) to set the
    /// connection string without modifying the YAML config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LOCKSTEP_STORE_URL") {
            self.url = val;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_store_url(),
        }
    }
}

/// Selectable store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store (single-process demo and tests).
    Memory,
    /// Redis-compatible store (shared between processes).
    Redis,
}

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// The initial pattern. Empty means the canonical tiled motif.
    #[serde(default = "default_init")]
    pub init: String,

    /// Upper bound on sweeps per phase before declaring a stall.
    #[serde(default = "default_max_sweeps")]
    pub max_sweeps: u64,

    /// Pause between sweeps, in milliseconds (paces the round rate).
    #[serde(default)]
    pub sweep_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            init: default_init(),
            max_sweeps: default_max_sweeps(),
            sweep_interval_ms: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_unit_prefix() -> String {
    "cell".to_owned()
}

const fn default_unit_count() -> usize {
    9
}

const fn default_rounds() -> u64 {
    4
}

const fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_store_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_init() -> String {
    "000111000".to_owned()
}

const fn default_max_sweeps() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_owned()
}
