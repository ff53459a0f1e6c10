use std::time::Duration;

use session_runtime::{InputRecord, SessionEvent, Shard, ShardConfig, INPUT_BYTES};
use tokio::sync::mpsc;

fn rec(session: u64, t: u64) -> InputRecord {
    InputRecord { session, t, dt: 1, payload: [0; INPUT_BYTES] }
}

#[tokio::test(start_paused = true)]
async fn late_session_is_served_before_backlog_drains() {
    const BACKLOG: u64 = 1_000;
    const A: u64 = 10;
    const B: u64 = 20;
    let cfg = ShardConfig {
        queue_capacity: 10_000,
        idle_timeout: Duration::from_secs(15),
        sweep_interval: Duration::from_secs(1),
        shutdown_grace: Duration::from_secs(60),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut shard = Shard::new(0, cfg).with_observer(tx);
    for t in 0..BACKLOG {
        shard.route_record(rec(A, t)).await;
    }
    shard.route_record(rec(B, 0)).await;
    let report = shard.shutdown().await;
    assert_eq!(report.processed, BACKLOG + 1);

    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    let b_created = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Created { session: B, .. }))
        .expect("B created");
    let b_served = events
        .iter()
        .position(|e| matches!(e, SessionEvent::Processed { session: B, .. }))
        .expect("B processed");
    let a_in_between = events[b_created..b_served]
        .iter()
        .filter(|e| matches!(e, SessionEvent::Processed { session: A, .. }))
        .count();
    assert!(a_in_between <= 4, "B waited behind {a_in_between} of A's records");

    let a_after = events[b_served..]
        .iter()
        .filter(|e| matches!(e, SessionEvent::Processed { session: A, .. }))
        .count();
    assert!(a_after > 0, "A's backlog drained before B was served");
}

#[tokio::test(start_paused = true)]
async fn per_session_order_is_preserved() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut shard = Shard::new(0, ShardConfig::default()).with_observer(tx);
    for t in 0..50 {
        shard.route_record(rec(1, t)).await;
        shard.route_record(rec(2, 100 + t)).await;
    }
    shard.shutdown().await;
    let mut seen: Vec<(u64, u64)> = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        if let SessionEvent::Processed { session, t, clock, .. } = ev {
            assert_eq!(clock, t + 1);
            seen.push((session, t));
        }
    }
    let ts = |s: u64| seen.iter().filter(|(x, _)| *x == s).map(|(_, t)| *t).collect::<Vec<_>>();
    assert_eq!(ts(1), (0..50).collect::<Vec<_>>());
    assert_eq!(ts(2), (100..150).collect::<Vec<_>>());
}
