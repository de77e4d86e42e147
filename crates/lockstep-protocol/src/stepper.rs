//! Per-unit cell logic and the B3/S23 transition rule.
//!
//! The stepper is invoked on every unit, every time that unit observes a
//! change anywhere in the shared store. It re-derives its full output
//! from the snapshot it is handed: locate itself in the published
//! topology, read its own and its neighbours' liveness from the published
//! board, apply the automaton rule, and publish the next value tagged
//! with the round it feeds. Running it twice on unchanged inputs produces
//! an identical bag -- duplicated and out-of-order wake-ups are harmless.
//!
//! A unit left unseated by the square truncation publishes nothing and
//! reports `unused`: a stable terminal state.

use lockstep_types::{
    Board, CellState, ParseError, ReportMap, Status, Topology, UnitId, WorldView, WriteSet,
};
use tracing::debug;

use crate::error::ProtocolError;
use crate::wire;

/// The result of one stepper invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellOutcome {
    /// The full replacement for this unit's bag, when there is one.
    /// `None` for the unused terminal state and for every failure --
    /// the bag is left in its last-known-good state.
    pub writes: Option<WriteSet>,

    /// The unit's reported status.
    pub status: Status,
}

/// The standard Game of Life transition rule (B3/S23).
///
/// A live cell survives with two or three live neighbours; a dead cell
/// is born with exactly three.
pub const fn next_state(alive: bool, neighbours_alive: usize) -> bool {
    matches!((alive, neighbours_alive), (true, 2 | 3) | (false, 3))
}

/// Run the Cell Stepper for `unit` against a world snapshot.
///
/// Never returns an error: failures are converted into the unit's
/// status at this boundary, with no writes.
pub fn step_cell(view: &WorldView, unit: &UnitId) -> CellOutcome {
    try_step_cell(view, unit).unwrap_or_else(|e| {
        debug!(unit = %unit, error = %e, "stepper did not publish");
        CellOutcome {
            writes: None,
            status: e.to_status(),
        }
    })
}

/// The fallible body of [`step_cell`].
fn try_step_cell(view: &WorldView, unit: &UnitId) -> Result<CellOutcome, ProtocolError> {
    let topology = read_topology(view)?;

    // Truncation left this unit without a seat: terminal, no writes.
    let Some(own_index) = topology.position_of(unit) else {
        return Ok(CellOutcome {
            writes: None,
            status: Status::Active("unused".to_owned()),
        });
    };

    let run = read_run(view)?;
    if !run {
        return reset_report(view, unit, own_index);
    }

    let round = read_round(view)?;
    let board = read_board(view)?;

    let live = settled_cell(&board, own_index, round)?;
    let mut neighbours_alive = 0_usize;
    for neighbour in neighbour_list(&topology, unit)? {
        let index = topology.position_of(neighbour).ok_or_else(|| {
            ProtocolError::Malformed {
                key: wire::MAP.to_owned(),
                source: ParseError::InvalidTopology(format!("{neighbour} has no seat")),
            }
        })?;
        if settled_cell(&board, index, round)?.is_alive() {
            neighbours_alive = neighbours_alive.saturating_add(1);
        }
    }

    let next = if next_state(live.is_alive(), neighbours_alive) {
        CellState::Alive
    } else {
        CellState::Dead
    };

    // Answer the published round: the value lands under round + 1, the
    // previous answer is kept, everything older is pruned. At most two
    // entries ever live in the bag.
    let answer = round.checked_add(1).ok_or(ProtocolError::RoundOverflow)?;
    let mut reports = own_reports(view, unit)?;
    reports.insert(answer, next);
    reports.retain_rounds(round, answer);

    debug!(
        unit = %unit,
        round,
        alive = live.is_alive(),
        neighbours_alive,
        next = %next,
        "cell stepped"
    );

    Ok(CellOutcome {
        writes: Some(WriteSet::unit(unit.clone(), reports.to_bag())),
        status: Status::Active(String::new()),
    })
}

/// Reset path: replace the whole bag with the initial value for this
/// cell's grid position, tagged at round 0.
fn reset_report(
    view: &WorldView,
    unit: &UnitId,
    own_index: usize,
) -> Result<CellOutcome, ProtocolError> {
    let init = read_init(view)?;
    let value = init
        .get(own_index)
        .ok_or_else(|| ProtocolError::Malformed {
            key: wire::INIT.to_owned(),
            source: ParseError::IndexOutOfRange {
                index: own_index,
                len: init.len(),
            },
        })?;
    if !value.is_settled() {
        return Err(ProtocolError::Malformed {
            key: wire::INIT.to_owned(),
            source: ParseError::InvalidCell(value.as_char()),
        });
    }

    let mut reports = ReportMap::new();
    reports.insert(0, value);

    Ok(CellOutcome {
        writes: Some(WriteSet::unit(unit.clone(), reports.to_bag())),
        status: Status::Active(String::new()),
    })
}

/// This unit's previously published reports.
fn own_reports(view: &WorldView, unit: &UnitId) -> Result<ReportMap, ProtocolError> {
    ReportMap::from_bag(&view.unit_bag(unit)).map_err(|source| ProtocolError::Malformed {
        key: unit.to_string(),
        source,
    })
}

/// A board cell that must already hold a settled value for this round.
fn settled_cell(board: &Board, index: usize, round: u64) -> Result<CellState, ProtocolError> {
    let state = board.get(index).ok_or_else(|| ProtocolError::Malformed {
        key: wire::BOARD.to_owned(),
        source: ParseError::IndexOutOfRange {
            index,
            len: board.len(),
        },
    })?;
    if state.is_settled() {
        Ok(state)
    } else {
        Err(ProtocolError::AwaitingBoard { round })
    }
}

/// The seated neighbour list for `unit`.
fn neighbour_list<'a>(
    topology: &'a Topology,
    unit: &UnitId,
) -> Result<&'a [UnitId], ProtocolError> {
    topology
        .neighbours(unit)
        .ok_or_else(|| ProtocolError::Malformed {
            key: wire::MAP.to_owned(),
            source: ParseError::InvalidTopology(format!("{unit} has no neighbour list")),
        })
}

/// Read and decode the published topology.
fn read_topology(view: &WorldView) -> Result<Topology, ProtocolError> {
    let raw = require_app(view, wire::MAP)?;
    Topology::from_wire(raw).map_err(|source| ProtocolError::Malformed {
        key: wire::MAP.to_owned(),
        source,
    })
}

/// Read and decode the published round counter.
fn read_round(view: &WorldView) -> Result<u64, ProtocolError> {
    let raw = require_app(view, wire::ROUND)?;
    wire::decode_round(raw).map_err(|source| ProtocolError::Malformed {
        key: wire::ROUND.to_owned(),
        source,
    })
}

/// Read and decode the published run flag.
fn read_run(view: &WorldView) -> Result<bool, ProtocolError> {
    let raw = require_app(view, wire::RUN)?;
    wire::decode_run(raw).map_err(|source| ProtocolError::Malformed {
        key: wire::RUN.to_owned(),
        source,
    })
}

/// Read and decode the published board.
fn read_board(view: &WorldView) -> Result<Board, ProtocolError> {
    let raw = require_app(view, wire::BOARD)?;
    raw.parse().map_err(|source| ProtocolError::Malformed {
        key: wire::BOARD.to_owned(),
        source,
    })
}

/// Read and decode the published initial pattern.
fn read_init(view: &WorldView) -> Result<Board, ProtocolError> {
    let raw = require_app(view, wire::INIT)?;
    raw.parse().map_err(|source| ProtocolError::Malformed {
        key: wire::INIT.to_owned(),
        source,
    })
}

/// An application bag value that must be present by now.
fn require_app<'a>(view: &'a WorldView, key: &str) -> Result<&'a str, ProtocolError> {
    view.app_value(key)
        .ok_or_else(|| ProtocolError::AwaitingCoordinator {
            key: key.to_owned(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use lockstep_types::Entity;

    use super::*;
    use crate::topology::build_topology;

    fn units(n: usize) -> Vec<UnitId> {
        (0..n).map(|i| UnitId::new(format!("app/{i:02}"))).collect()
    }

    /// A 3x3 world with the given board, round, and run flag published.
    fn world(board: &str, round: u64, run: bool) -> WorldView {
        let members = units(9);
        let topology = build_topology(&members);
        let mut app = BTreeMap::new();
        app.insert(wire::MAP.to_owned(), topology.to_wire());
        app.insert(wire::ROUND.to_owned(), wire::encode_round(round));
        app.insert(wire::BOARD.to_owned(), board.to_owned());
        app.insert(wire::INIT.to_owned(), "000111000".to_owned());
        app.insert(wire::RUN.to_owned(), wire::encode_run(run));
        WorldView {
            app,
            units: members.iter().map(|u| (u.clone(), BTreeMap::new())).collect(),
            members,
        }
    }

    fn unit(i: usize) -> UnitId {
        UnitId::new(format!("app/{i:02}"))
    }

    fn published_value(outcome: &CellOutcome, round: u64) -> Option<CellState> {
        let writes = outcome.writes.as_ref()?;
        ReportMap::from_bag(&writes.bag).ok()?.value_for(round)
    }

    #[test]
    fn rule_literal_cases() {
        assert!(next_state(true, 2));
        assert!(!next_state(true, 1));
        assert!(next_state(false, 3));
        assert!(!next_state(false, 2));
        assert!(next_state(true, 3));
        assert!(!next_state(true, 4));
    }

    #[test]
    fn center_of_blinker_survives() {
        // Board 000111000: the center (index 4) has two live neighbours.
        let view = world("000111000", 0, true);
        let outcome = step_cell(&view, &unit(4));
        assert!(outcome.status.is_active());
        assert_eq!(published_value(&outcome, 1), Some(CellState::Alive));
    }

    #[test]
    fn corner_of_blinker_stays_dead() {
        // Index 0 sees two live neighbours (3 and 4): dead stays dead.
        let view = world("000111000", 0, true);
        let outcome = step_cell(&view, &unit(0));
        assert_eq!(published_value(&outcome, 1), Some(CellState::Dead));
    }

    #[test]
    fn top_middle_of_blinker_is_born() {
        // Index 1 sees exactly three live neighbours (3, 4, 5): birth.
        let view = world("000111000", 0, true);
        let outcome = step_cell(&view, &unit(1));
        assert_eq!(published_value(&outcome, 1), Some(CellState::Alive));
    }

    #[test]
    fn wing_of_blinker_dies() {
        // Index 3 is alive with one live neighbour (4): underpopulation.
        let view = world("000111000", 0, true);
        let outcome = step_cell(&view, &unit(3));
        assert_eq!(published_value(&outcome, 1), Some(CellState::Dead));
    }

    #[test]
    fn replay_is_idempotent() {
        let view = world("000111000", 3, true);
        let one = step_cell(&view, &unit(4));
        let two = step_cell(&view, &unit(4));
        assert_eq!(one, two);
    }

    #[test]
    fn answer_is_tagged_with_next_round() {
        let view = world("000111000", 7, true);
        let outcome = step_cell(&view, &unit(4));
        assert_eq!(published_value(&outcome, 8), Some(CellState::Alive));
        assert_eq!(published_value(&outcome, 7), None);
    }

    #[test]
    fn stale_entries_are_pruned() {
        let mut view = world("000111000", 7, true);
        let me = unit(4);
        let mut old = BTreeMap::new();
        old.insert("5".to_owned(), "1".to_owned());
        old.insert("7".to_owned(), "0".to_owned());
        view.units.insert(me.clone(), old);

        let outcome = step_cell(&view, &me);
        let bag = outcome.writes.unwrap().bag;
        let reports = ReportMap::from_bag(&bag).unwrap();
        // Round 5 is gone; rounds 7 (kept) and 8 (new answer) remain.
        assert_eq!(reports.len(), 2);
        assert_eq!(reports.value_for(5), None);
        assert_eq!(reports.value_for(7), Some(CellState::Dead));
        assert_eq!(reports.value_for(8), Some(CellState::Alive));
    }

    #[test]
    fn cache_never_exceeds_two_entries() {
        let view = world("000111000", 2, true);
        let me = unit(4);
        let outcome = step_cell(&view, &me);
        let bag = outcome.writes.unwrap().bag;
        assert!(ReportMap::from_bag(&bag).unwrap().len() <= 2);
    }

    #[test]
    fn unseated_unit_is_unused() {
        // A 10th member gets no seat on the 3x3 grid.
        let mut view = world("000111000", 0, true);
        let extra = UnitId::new("app/99");
        view.members.push(extra.clone());
        view.units.insert(extra.clone(), BTreeMap::new());

        let outcome = step_cell(&view, &extra);
        assert_eq!(outcome.writes, None);
        assert_eq!(outcome.status, Status::Active("unused".to_owned()));
    }

    #[test]
    fn reset_seeds_initial_value_at_round_zero() {
        let view = world("000111000", 5, false);
        let outcome = step_cell(&view, &unit(4));
        let writes = outcome.writes.unwrap();
        assert_eq!(writes.owner, Entity::Unit(unit(4)));
        let reports = ReportMap::from_bag(&writes.bag).unwrap();
        assert_eq!(reports.len(), 1);
        // Init 000111000: index 4 starts alive.
        assert_eq!(reports.value_for(0), Some(CellState::Alive));
    }

    #[test]
    fn reset_discards_cached_reports() {
        let mut view = world("000111000", 5, false);
        let me = unit(0);
        let mut old = BTreeMap::new();
        old.insert("5".to_owned(), "1".to_owned());
        old.insert("6".to_owned(), "1".to_owned());
        view.units.insert(me.clone(), old);

        let outcome = step_cell(&view, &me);
        let reports = ReportMap::from_bag(&outcome.writes.unwrap().bag).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports.value_for(0), Some(CellState::Dead));
    }

    #[test]
    fn missing_coordinator_data_waits() {
        let view = WorldView::default();
        let outcome = step_cell(&view, &unit(0));
        assert_eq!(outcome.writes, None);
        assert!(matches!(outcome.status, Status::Waiting(_)));
    }

    #[test]
    fn unsettled_board_waits() {
        let view = world("000111.00", 0, true);
        // Index 8 neighbours index 6 -- fine -- but index 5's neighbour 6
        // is settled; use the cell whose neighbourhood covers the dot.
        let outcome = step_cell(&view, &unit(7));
        assert_eq!(outcome.writes, None);
        assert!(matches!(outcome.status, Status::Waiting(_)));
    }

    #[test]
    fn malformed_round_blocks() {
        let mut view = world("000111000", 0, true);
        view.app
            .insert(wire::ROUND.to_owned(), "not-a-round".to_owned());
        let outcome = step_cell(&view, &unit(4));
        assert_eq!(outcome.writes, None);
        assert!(outcome.status.is_blocked());
        assert!(outcome.status.message().contains("not-a-round"));
    }

    #[test]
    fn short_board_blocks() {
        let view = world("0001", 0, true);
        let outcome = step_cell(&view, &unit(8));
        assert!(outcome.status.is_blocked());
    }

    #[test]
    fn corrupt_own_bag_blocks() {
        let mut view = world("000111000", 0, true);
        let me = unit(4);
        let mut bad = BTreeMap::new();
        bad.insert("3".to_owned(), "alive".to_owned());
        view.units.insert(me.clone(), bad);

        let outcome = step_cell(&view, &me);
        assert!(outcome.status.is_blocked());
    }
}
