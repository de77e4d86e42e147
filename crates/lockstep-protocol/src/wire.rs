//! Application bag keys and scalar wire encodings.
//!
//! The application-scoped bag carries five keys, all written by the
//! coordinator on every invocation:
//!
//! | Key | Encoding | Description |
//! |-----|----------|-------------|
//! | `round` | decimal integer | The current round counter |
//! | `map` | JSON object | Topology: identity to neighbour list |
//! | `board` | raw state string | The current board snapshot |
//! | `init` | raw state string | The seated initial pattern |
//! | `run` | JSON bool | The run flag |
//!
//! Scalar decode failures are reported as [`ParseError`] carrying the
//! raw value, so the blocked status can echo what was actually stored.

use lockstep_types::ParseError;

/// Application bag key for the round counter.
pub const ROUND: &str = "round";

/// Application bag key for the serialized topology.
pub const MAP: &str = "map";

/// Application bag key for the board snapshot.
pub const BOARD: &str = "board";

/// Application bag key for the seated initial pattern.
pub const INIT: &str = "init";

/// Application bag key for the run flag.
pub const RUN: &str = "run";

/// Decode a round counter from its decimal wire form.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRound`] if the value is not a
/// non-negative decimal integer.
pub fn decode_round(raw: &str) -> Result<u64, ParseError> {
    raw.parse::<u64>()
        .map_err(|_err| ParseError::InvalidRound(raw.to_owned()))
}

/// Render a round counter to its wire form.
pub fn encode_round(round: u64) -> String {
    round.to_string()
}

/// Decode the run flag from its JSON bool wire form.
///
/// # Errors
///
/// Returns [`ParseError::InvalidRound`] -- reused for scalar decode
/// failures -- if the value is neither `true` nor `false`.
pub fn decode_run(raw: &str) -> Result<bool, ParseError> {
    serde_json::from_str::<bool>(raw).map_err(|_err| ParseError::InvalidRound(raw.to_owned()))
}

/// Render the run flag to its wire form.
pub fn encode_run(run: bool) -> String {
    if run { "true".to_owned() } else { "false".to_owned() }
}
