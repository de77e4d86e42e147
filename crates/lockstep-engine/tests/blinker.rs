//! End-to-end round-synchronization tests over the in-memory store.
//!
//! These exercise the full feedback loop -- stepper reports feeding the
//! aggregator feeding the steppers -- under orderly, rotated, duplicated,
//! and adversarial invocation orders. The 3x3 blinker is the reference
//! scenario: `000111000` oscillates with period 2.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;
use std::time::Duration;

use lockstep_engine::driver::Driver;
use lockstep_engine::error::EngineError;
use lockstep_protocol::lifecycle::{RunSettings, UnitContext, handle_invocation};
use lockstep_protocol::wire;
use lockstep_store::{MemoryStore, RelationStore};
use lockstep_types::{ReportMap, Status, UnitId};

const BLINKER: &str = "000111000";
const BLINKER_FLIPPED: &str = "010010010";

fn units(n: usize) -> Vec<UnitId> {
    (0..n).map(|i| UnitId::new(format!("cell/{i:02}"))).collect()
}

fn settings(run: bool, init: &str) -> RunSettings {
    RunSettings {
        run,
        init: init.to_owned(),
    }
}

/// Invoke one unit by hand: snapshot, handle, apply.
async fn invoke(store: &MemoryStore, unit: &UnitId, is_leader: bool, s: &RunSettings) -> Status {
    let view = store.snapshot().await.unwrap();
    let ctx = UnitContext {
        unit: unit.clone(),
        is_leader,
        settings: s.clone(),
    };
    let invocation = handle_invocation(&view, &ctx);
    for writes in &invocation.writes {
        store.apply(writes).await.unwrap();
    }
    invocation.unit_status
}

/// The published (round, board) pair, if any.
async fn published(store: &MemoryStore) -> (Option<u64>, Option<String>) {
    let view = store.snapshot().await.unwrap();
    let round = view
        .app_value(wire::ROUND)
        .and_then(|raw| wire::decode_round(raw).ok());
    let board = view.app_value(wire::BOARD).map(str::to_owned);
    (round, board)
}

async fn driver_for(store: Arc<MemoryStore>, n: usize) -> Driver {
    let driver = Driver::new(store, units(n), Duration::ZERO);
    driver.register_all().await.unwrap();
    driver
}

#[tokio::test]
async fn blinker_oscillates_with_period_two() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 9).await;

    let reset = driver
        .run_until_settled(&settings(false, BLINKER), 100)
        .await
        .unwrap();
    assert_eq!(
        reset.app_status,
        Status::Active(format!("Reset [{BLINKER}]"))
    );

    // One full synchronized round flips the blinker; the next flips it
    // back. Keep going for two full periods.
    let run = settings(true, BLINKER);
    for goal in 1..=4 {
        let outcome = driver.run_rounds(&run, goal, 100).await.unwrap();
        assert_eq!(outcome.round, Some(goal));
        let expected = if goal % 2 == 1 { BLINKER_FLIPPED } else { BLINKER };
        assert_eq!(outcome.board.as_deref(), Some(expected), "round {goal}");
    }
}

#[tokio::test]
async fn tenth_unit_is_unused_and_harmless() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 10).await;

    driver
        .run_until_settled(&settings(false, BLINKER), 100)
        .await
        .unwrap();
    let outcome = driver
        .run_rounds(&settings(true, BLINKER), 1, 100)
        .await
        .unwrap();
    assert_eq!(outcome.board.as_deref(), Some(BLINKER_FLIPPED));

    // The unseated unit reported the terminal state and wrote nothing.
    let last = UnitId::new("cell/09");
    let status = invoke(&store, &last, false, &settings(true, BLINKER)).await;
    assert_eq!(status, Status::Active("unused".to_owned()));
    let view = store.snapshot().await.unwrap();
    assert!(view.unit_bag(&last).is_empty());
}

#[tokio::test]
async fn duplicate_invocations_neither_advance_nor_bloat() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 9).await;
    driver
        .run_until_settled(&settings(false, BLINKER), 100)
        .await
        .unwrap();

    // Flip the flag via one leader invocation, then hammer a single
    // follower before any of its peers get to react.
    let run = settings(true, BLINKER);
    let leader = UnitId::new("cell/00");
    invoke(&store, &leader, true, &run).await;
    let (round_before, _) = published(&store).await;

    let follower = UnitId::new("cell/05");
    for _ in 0..5 {
        let status = invoke(&store, &follower, false, &run).await;
        assert!(status.is_active());
    }

    // The global round did not move and the follower's cache is bounded.
    let (round_after, _) = published(&store).await;
    assert_eq!(round_before, round_after);
    let view = store.snapshot().await.unwrap();
    let reports = ReportMap::from_bag(&view.unit_bag(&follower)).unwrap();
    assert!(reports.len() <= 2);
}

#[tokio::test]
async fn straggler_stalls_the_round() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 9).await;
    driver
        .run_until_settled(&settings(false, BLINKER), 100)
        .await
        .unwrap();

    // Everyone but cell/08 answers round 0, repeatedly.
    let run = settings(true, BLINKER);
    let all = units(9);
    for _ in 0..5 {
        for unit in all.iter().take(8) {
            let is_leader = *unit == all[0];
            invoke(&store, unit, is_leader, &run).await;
        }
    }

    // The coordinator keeps waiting; the round never advances.
    let (round, _) = published(&store).await;
    assert_eq!(round, Some(0));

    // The straggler catches up, and the next leader pass advances.
    invoke(&store, &all[8], false, &run).await;
    invoke(&store, &all[0], true, &run).await;
    let (round, board) = published(&store).await;
    assert_eq!(round, Some(1));
    assert_eq!(board.as_deref(), Some(BLINKER_FLIPPED));
}

#[tokio::test]
async fn adversarial_invocation_order_still_converges() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 9).await;
    driver
        .run_until_settled(&settings(false, BLINKER), 100)
        .await
        .unwrap();

    // Reverse order, duplicated mid-sweep, leader wedged in the middle:
    // the protocol must not care.
    let run = settings(true, BLINKER);
    let all = units(9);
    let mut order: Vec<(usize, bool)> = Vec::new();
    for i in (0..9).rev() {
        order.push((i, false));
        order.push((4, false));
        if i == 5 {
            order.push((0, true));
        }
    }
    order.push((0, true));
    order.push((0, true));

    for _ in 0..6 {
        for (i, is_leader) in &order {
            invoke(&store, &all[*i], *is_leader, &run).await;
        }
    }

    let (round, board) = published(&store).await;
    let round = round.unwrap();
    assert!(round >= 2, "expected at least two advances, got {round}");
    let expected = if round % 2 == 1 { BLINKER_FLIPPED } else { BLINKER };
    assert_eq!(board.as_deref(), Some(expected));
}

#[tokio::test]
async fn membership_growth_reseats_the_grid_during_reset() {
    let store = Arc::new(MemoryStore::new());
    let pattern = BLINKER;

    // Start with four units: a 2x2 grid seating "0001".
    let small = driver_for(Arc::clone(&store), 4).await;
    let outcome = small
        .run_until_settled(&settings(false, pattern), 100)
        .await
        .unwrap();
    assert_eq!(outcome.board.as_deref(), Some("0001"));

    // Five more join; the same store now seats the full 3x3 pattern.
    let grown = driver_for(Arc::clone(&store), 9).await;
    let outcome = grown
        .run_until_settled(&settings(false, pattern), 100)
        .await
        .unwrap();
    assert_eq!(outcome.board.as_deref(), Some(BLINKER));
    assert_eq!(
        outcome.app_status,
        Status::Active(format!("Reset [{BLINKER}]"))
    );
}

#[tokio::test]
async fn corrupt_application_state_stalls_the_world() {
    let store = Arc::new(MemoryStore::new());
    let driver = driver_for(Arc::clone(&store), 4).await;
    driver
        .run_until_settled(&settings(false, "0110"), 100)
        .await
        .unwrap();

    // Corrupt the round counter in the application bag. The aggregator
    // blocks rather than guessing, leaves the bag untouched, and the
    // steppers wait on the now-missing coordinator keys: the world
    // stalls until the state is externally repaired.
    let mut bag = std::collections::BTreeMap::new();
    bag.insert("round".to_owned(), "zero".to_owned());
    store
        .apply(&lockstep_types::WriteSet::application(bag))
        .await
        .unwrap();

    let result = driver.run_rounds(&settings(true, "0110"), 3, 50).await;
    match result {
        Err(EngineError::Stalled { last_status, .. }) => {
            assert!(last_status.contains("malformed shared data"));
        }
        other => panic!("expected a stall, got {other:?}"),
    }
}
