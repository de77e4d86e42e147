//! The per-unit handler boundary.
//!
//! One invocation of a unit is one call to [`handle_invocation`]: run the
//! Cell Stepper for the unit's own cell, and -- only when this unit is
//! currently the coordinator -- run the Round Aggregator on behalf of the
//! application. Leadership is an explicit input, re-checked every
//! invocation, never inherited state.
//!
//! The run flag decides which data source feeds the stepper: with
//! `run = true` units step from live published state; with `run = false`
//! every unit is forced back to its cell of the canonical initial
//! pattern. Units learn the flag from the application bag; the
//! coordinator takes it from external configuration and republishes it.
//!
//! No failure crosses this boundary. Both component entry points convert
//! their errors into status strings, so an invocation always terminates
//! with a set of whole-bag writes (possibly empty) and statuses.

use lockstep_types::{Status, UnitId, WorldView, WriteSet};

use crate::aggregator::aggregate;
use crate::stepper::step_cell;

/// The original deployment's 64-cell initial pattern motif.
const INIT_MOTIF: &str = "0001110001010101111110001110010101010101001010101000111101010111";

/// How many times the motif is tiled to cover large grids.
const INIT_TILES: usize = 99;

/// The canonical initial pattern, tiled to cover any practical grid.
pub fn default_pattern() -> String {
    INIT_MOTIF.repeat(INIT_TILES)
}

/// External configuration consumed by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// The run flag: `false` drives the reset protocol.
    pub run: bool,

    /// The configured initial pattern (truncated to the seated grid
    /// when published).
    pub init: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            run: false,
            init: default_pattern(),
        }
    }
}

/// Everything one invocation needs to know about the invoked unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitContext {
    /// The invoked unit's identity.
    pub unit: UnitId,

    /// Whether this unit is currently the coordinator. Dynamic: the
    /// value may differ between invocations of the same unit.
    pub is_leader: bool,

    /// External configuration (only consulted when leading).
    pub settings: RunSettings,
}

/// The complete result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Whole-bag writes to apply: at most the unit's own bag and (on
    /// the leader) the application bag.
    pub writes: Vec<WriteSet>,

    /// The unit's own status.
    pub unit_status: Status,

    /// The application status, when this invocation led.
    pub app_status: Option<Status>,
}

/// Handle one invocation of `unit` against a world snapshot.
///
/// Re-derives everything from `view`; safe to call any number of times,
/// in any order relative to other units, with any staleness.
pub fn handle_invocation(view: &WorldView, ctx: &UnitContext) -> Invocation {
    let cell = step_cell(view, &ctx.unit);

    let mut writes = Vec::new();
    if let Some(w) = cell.writes {
        writes.push(w);
    }

    let app_status = if ctx.is_leader {
        let outcome = aggregate(view, &ctx.settings);
        if let Some(w) = outcome.writes {
            writes.push(w);
        }
        Some(outcome.status)
    } else {
        None
    };

    Invocation {
        writes,
        unit_status: cell.status,
        app_status,
    }
}
