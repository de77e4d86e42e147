//! The protocol error taxonomy.
//!
//! Failures split into two classes: blocked (corrupted shared state or
//! impossible configuration, needing external remediation) and waiting
//! (data another entity simply has not published yet, resolved by a
//! later invocation). An incomplete round is neither -- the aggregator
//! treats it as a normal decision, not a failure. Every error is
//! converted to a status string at the handler boundary; none crosses a
//! unit boundary.

use lockstep_types::{ParseError, Status};

/// Errors that can occur during a protocol invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The initial pattern cannot seat the truncated grid. Resolved
    /// externally (a larger pattern or fewer members).
    #[error("initial pattern too small: grid seats {required} cells, pattern has {available}")]
    PatternTooSmall {
        /// Cells the truncated grid seats.
        required: usize,
        /// Characters available in the configured pattern.
        available: usize,
    },

    /// A value in the shared store failed to parse. The protocol does
    /// not self-heal corrupted shared state; this blocks until the
    /// offending entry is corrected externally.
    #[error("malformed shared data at {key}: {source}")]
    Malformed {
        /// The bag key (or unit identity) holding the bad value.
        key: String,
        /// The underlying parse failure.
        source: ParseError,
    },

    /// The coordinator has not yet published a required key. A later
    /// invocation resolves this without intervention.
    #[error("waiting for coordinator data: {key}")]
    AwaitingCoordinator {
        /// The missing application bag key.
        key: String,
    },

    /// The published board does not yet carry a settled value for a
    /// needed cell.
    #[error("board not settled for round {round}")]
    AwaitingBoard {
        /// The round whose board is still incomplete.
        round: u64,
    },

    /// The round counter would overflow.
    #[error("round counter overflow: cannot advance beyond u64::MAX")]
    RoundOverflow,
}

impl ProtocolError {
    /// Convert the error into the boundary status.
    ///
    /// Waiting-class conditions become [`Status::Waiting`]; everything
    /// else blocks pending external remediation. The message is the
    /// error's own rendering -- the status string is the only failure
    /// signal the system has.
    pub fn to_status(&self) -> Status {
        match self {
            Self::AwaitingCoordinator { .. } | Self::AwaitingBoard { .. } => {
                Status::Waiting(self.to_string())
            }
            Self::PatternTooSmall { .. } | Self::Malformed { .. } | Self::RoundOverflow => {
                Status::Blocked(self.to_string())
            }
        }
    }
}
