//! Wire parse errors.
//!
//! Values read back from the shared store are plain strings; any of them
//! can be corrupt. Parse failures carry enough detail to be echoed in a
//! blocked status, since that status string is the only failure signal
//! the system has.

/// Errors raised while decoding store values into typed form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A board character outside the `0` / `1` / `.` alphabet.
    #[error("invalid cell character {0:?}")]
    InvalidCell(char),

    /// A report entry whose value is not `"0"` or `"1"`.
    #[error("invalid report value {value:?} for round {round}")]
    InvalidReportValue {
        /// The round key the bad value was stored under.
        round: u64,
        /// The raw stored value.
        value: String,
    },

    /// A value that should be a non-negative decimal round number.
    #[error("invalid round number {0:?}")]
    InvalidRound(String),

    /// A published sequence shorter than the seated grid requires.
    #[error("value too short for the seated grid: need index {index}, length {len}")]
    IndexOutOfRange {
        /// The board index that was required.
        index: usize,
        /// The actual sequence length.
        len: usize,
    },

    /// A serialized topology map that does not decode.
    #[error("invalid topology map: {0}")]
    InvalidTopology(String),
}
