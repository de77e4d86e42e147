//! Engine library for the Lockstep simulation.
//!
//! The engine hosts a population of logical units inside one process and
//! plays the role of the external event-delivery mechanism: every unit
//! is re-invoked against a fresh store snapshot whenever the store is
//! observed to have changed, in a deliberately rotating and redundant
//! order. The protocol itself neither knows nor cares that the units
//! happen to share a process.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `lockstep-config.yaml`.
//! - [`driver`] -- The reactive invocation driver and run loops.
//! - [`error`] -- Engine error types.

pub mod config;
pub mod driver;
pub mod error;

pub use config::EngineConfig;
pub use driver::{Driver, SweepOutcome};
pub use error::EngineError;
