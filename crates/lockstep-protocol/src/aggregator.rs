//! Coordinator-side round aggregation and advance.
//!
//! The aggregator runs once per coordinator invocation and re-derives
//! the entire application bag from the current snapshot: recompute the
//! topology from the membership, collect every seated member's newest
//! report, and decide whether the population has unanimously finished a
//! round. Advancement only happens on unanimous completion -- the
//! coordinator never forces a partial round -- and a stale-but-unanimous
//! population produces a byte-identical republish, which the store treats
//! as no change at all.
//!
//! With the run flag off the aggregator ignores completion entirely and
//! drives the world back to round 0 with the canonical initial pattern.

use std::collections::{BTreeMap, BTreeSet};

use lockstep_types::{Board, ParseError, ReportMap, Status, Topology, WorldView, WriteSet};
use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::lifecycle::RunSettings;
use crate::topology::build_topology;
use crate::wire;

/// The result of one aggregator invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// The full replacement for the application bag, when the
    /// invocation got far enough to decide one. `None` on failure --
    /// the bag is left in its last-known-good state.
    pub writes: Option<WriteSet>,

    /// The application status reported to the operator.
    pub status: Status,
}

/// What the collected reports say about the current round.
struct RoundState {
    /// Concatenated newest values in member order, `.` for silent units.
    candidate: String,
    /// The unanimously-completed round, when there is one.
    target: Option<u64>,
}

/// Run the Round Aggregator against a world snapshot.
///
/// Only meaningful on the coordinator; callers gate on leadership.
/// Never returns an error: failures are converted into the application
/// status at this boundary, with no writes.
pub fn aggregate(view: &WorldView, settings: &RunSettings) -> AggregateOutcome {
    try_aggregate(view, settings).unwrap_or_else(|e| {
        warn!(error = %e, "aggregation did not publish");
        AggregateOutcome {
            writes: None,
            status: e.to_status(),
        }
    })
}

/// The fallible body of [`aggregate`].
fn try_aggregate(
    view: &WorldView,
    settings: &RunSettings,
) -> Result<AggregateOutcome, ProtocolError> {
    let topology = build_topology(&view.members);
    let init = seated_pattern(&settings.init, topology.len())?;
    let state = collect_round_state(view, &topology)?;
    let current = published_round(view)?;

    // The full application bag is rebuilt on every invocation; the
    // always-present keys first, then round/board per the decision.
    let mut bag: BTreeMap<String, String> = BTreeMap::new();
    bag.insert(wire::MAP.to_owned(), topology.to_wire());
    bag.insert(wire::RUN.to_owned(), wire::encode_run(settings.run));
    bag.insert(wire::INIT.to_owned(), init.clone());

    let status = if settings.run {
        running_decision(view, &mut bag, &state, current)
    } else {
        reset_decision(&mut bag, &state, &init)
    };

    Ok(AggregateOutcome {
        writes: Some(WriteSet::application(bag)),
        status,
    })
}

/// Decide round and board under `run = true`.
fn running_decision(
    view: &WorldView,
    bag: &mut BTreeMap<String, String>,
    state: &RoundState,
    current: u64,
) -> Status {
    match state.target {
        // Unanimous completion at or beyond the published round: adopt
        // the candidate. Equal-round targets republish identically.
        Some(target) if target >= current => {
            bag.insert(wire::ROUND.to_owned(), wire::encode_round(target));
            bag.insert(wire::BOARD.to_owned(), state.candidate.clone());
            debug!(round = target, board = %state.candidate, "round complete");
            Status::Active(format!("{current}: [{}] --> {target}", state.candidate))
        }
        // Incomplete (or a stale unanimity below the published round):
        // keep the last known round and board, expose the partial
        // snapshot for observability only.
        _ => {
            bag.insert(wire::ROUND.to_owned(), wire::encode_round(current));
            if let Some(board) = view.app_value(wire::BOARD) {
                bag.insert(wire::BOARD.to_owned(), board.to_owned());
            }
            Status::Active(format!("{current}: [{}]", state.candidate))
        }
    }
}

/// Decide round and board under `run = false`: unconditional reset.
fn reset_decision(
    bag: &mut BTreeMap<String, String>,
    state: &RoundState,
    init: &str,
) -> Status {
    bag.insert(wire::ROUND.to_owned(), wire::encode_round(0));
    bag.insert(wire::BOARD.to_owned(), init.to_owned());

    if state.target == Some(0) {
        // Every seated unit has published its round-0 value.
        Status::Active(format!("Reset [{}]", state.candidate))
    } else {
        Status::Waiting(format!("Resetting... [{}]", state.candidate))
    }
}

/// Collect every seated member's newest report into a candidate board
/// and the unanimity verdict.
fn collect_round_state(
    view: &WorldView,
    topology: &Topology,
) -> Result<RoundState, ProtocolError> {
    let mut rounds: BTreeSet<u64> = BTreeSet::new();
    let mut silent = false;
    let mut candidate = String::new();

    for member in topology.members() {
        let reports = ReportMap::from_bag(&view.unit_bag(member)).map_err(|source| {
            ProtocolError::Malformed {
                key: member.to_string(),
                source,
            }
        })?;
        match reports.newest() {
            Some((round, value)) => {
                rounds.insert(round);
                candidate.push(value.as_char());
            }
            None => {
                silent = true;
                candidate.push('.');
            }
        }
    }

    // A silent unit blocks completion; so does any disagreement on the
    // newest round. Both are ordinary waiting states.
    let target = if silent || rounds.len() != 1 {
        None
    } else {
        rounds.first().copied()
    };

    Ok(RoundState { candidate, target })
}

/// Validate the configured pattern and truncate it to the seated grid.
fn seated_pattern(pattern: &str, cells: usize) -> Result<String, ProtocolError> {
    let mut board: Board = pattern.parse().map_err(|source| ProtocolError::Malformed {
        key: wire::INIT.to_owned(),
        source,
    })?;
    if !board.is_settled() {
        return Err(ProtocolError::Malformed {
            key: wire::INIT.to_owned(),
            source: ParseError::InvalidCell('.'),
        });
    }
    if board.len() < cells {
        return Err(ProtocolError::PatternTooSmall {
            required: cells,
            available: board.len(),
        });
    }
    board.truncate(cells);
    Ok(board.to_string())
}

/// The currently published round, defaulting to 0 when nothing has been
/// published yet.
fn published_round(view: &WorldView) -> Result<u64, ProtocolError> {
    view.app_value(wire::ROUND).map_or(Ok(0), |raw| {
        wire::decode_round(raw).map_err(|source| ProtocolError::Malformed {
            key: wire::ROUND.to_owned(),
            source,
        })
    })
}
