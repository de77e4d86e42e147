//! A unit's sparse round-to-value report cache.
//!
//! Each unit owns one bag in the shared store and publishes its answers
//! there as `{"<round>": "<0|1>", ...}`. The cache is bounded: a unit
//! retains at most two entries at once (the round it last answered and
//! the round it is answering), pruning everything else on each
//! invocation. Readers only ever consume the newest entry.

use std::collections::BTreeMap;

use crate::cell::CellState;
use crate::error::ParseError;

/// A unit's published reports, keyed by round.
///
/// Parsed from and rendered to the unit's store bag. Keys that are not
/// decimal round numbers are ignored on parse -- foreign bag entries do
/// not poison the report -- but a round key with a value outside
/// `"0"` / `"1"` is malformed shared data and fails the parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMap(BTreeMap<u64, CellState>);

impl ReportMap {
    /// Create an empty report map.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Parse a report map from a unit's raw bag.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidReportValue`] if a round-keyed entry
    /// holds anything other than `"0"` or `"1"`.
    pub fn from_bag(bag: &BTreeMap<String, String>) -> Result<Self, ParseError> {
        let mut reports = BTreeMap::new();
        for (key, value) in bag {
            let Ok(round) = key.parse::<u64>() else {
                continue;
            };
            let state = match value.as_str() {
                "0" => CellState::Dead,
                "1" => CellState::Alive,
                other => {
                    return Err(ParseError::InvalidReportValue {
                        round,
                        value: other.to_owned(),
                    });
                }
            };
            reports.insert(round, state);
        }
        Ok(Self(reports))
    }

    /// Render the reports back into bag form.
    pub fn to_bag(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(round, state)| (round.to_string(), state.as_char().to_string()))
            .collect()
    }

    /// The newest published report, if any.
    pub fn newest(&self) -> Option<(u64, CellState)> {
        self.0.last_key_value().map(|(r, s)| (*r, *s))
    }

    /// The value published for a specific round, if any.
    pub fn value_for(&self, round: u64) -> Option<CellState> {
        self.0.get(&round).copied()
    }

    /// Record a value for a round, overwriting any previous answer.
    pub fn insert(&mut self, round: u64, state: CellState) {
        self.0.insert(round, state);
    }

    /// Drop every entry except the two given rounds.
    ///
    /// This is the bounded-cache invariant: after pruning, at most the
    /// current and next round survive.
    pub fn retain_rounds(&mut self, current: u64, next: u64) {
        self.0.retain(|round, _| *round == current || *round == next);
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no report has been published.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
