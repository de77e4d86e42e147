//! Round-rate extraction from engine logs.
//!
//! Scans a log file for the coordinator's advance lines
//! (`... [<board>] --> <round>`) and reports the mean wall-clock seconds
//! per round between the first and last advance, grouped by board width.
//! Useful for comparing how round latency scales with grid size across
//! runs.
//!
//! ```bash
//! lockstep-engine 2>&1 | tee run.log
//! timings run.log
//! ```

use std::collections::BTreeMap;

use regex::Regex;

/// First and last observed advance for one board width:
/// (seconds-of-day, round).
type Span = ((u32, u64), (u32, u64));

/// Entry point: parse the log named by the first argument.
///
/// # Errors
///
/// Returns an error when no log file is named, the file cannot be read,
/// or the line pattern fails to compile.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .ok_or("usage: timings <logfile>")?;
    let text = std::fs::read_to_string(&path)?;

    let line = Regex::new(r"(\d{2}):(\d{2}):(\d{2}).*\[([01]+)\] --> (\d+)")?;

    let mut spans: BTreeMap<usize, Span> = BTreeMap::new();
    for captures in text.lines().filter_map(|l| line.captures(l)) {
        let Some(sample) = parse_advance(&captures) else {
            continue;
        };
        let (width, secs, round) = sample;
        spans
            .entry(width)
            .and_modify(|(_, last)| *last = (secs, round))
            .or_insert(((secs, round), (secs, round)));
    }

    for (width, ((first_secs, first_round), (last_secs, last_round))) in &spans {
        let rounds = last_round.saturating_sub(*first_round);
        let Ok(rounds) = u32::try_from(rounds) else {
            continue;
        };
        if rounds == 0 {
            continue;
        }
        let elapsed = last_secs.saturating_sub(*first_secs);
        let rate = f64::from(elapsed) / f64::from(rounds);
        println!("{width} {rate:.3}");
    }

    Ok(())
}

/// Pull (board width, seconds-of-day, round) out of one matched line.
fn parse_advance(captures: &regex::Captures<'_>) -> Option<(usize, u32, u64)> {
    let hours: u32 = captures.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = captures.get(2)?.as_str().parse().ok()?;
    let seconds: u32 = captures.get(3)?.as_str().parse().ok()?;
    let width = captures.get(4)?.as_str().len();
    let round: u64 = captures.get(5)?.as_str().parse().ok()?;

    let secs = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    Some((width, secs, round))
}
