use std::time::Duration;

use session_runtime::{InputRecord, SessionEvent, SessionState, Shard, ShardConfig, INPUT_BYTES};
use tokio::sync::{mpsc, watch};

fn rec(session: u64, t: u64) -> Vec<u8> {
    InputRecord { session, t, dt: 1, payload: [0; INPUT_BYTES] }.to_bytes()
}

fn cfg() -> ShardConfig {
    ShardConfig {
        queue_capacity: 64,
        idle_timeout: Duration::from_secs(15),
        sweep_interval: Duration::from_secs(1),
        shutdown_grace: Duration::from_secs(2),
    }
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn idle_session_is_swept_after_timeout() {
    let mut shard = Shard::new(0, cfg());
    shard.route(&rec(7, 1)).await.unwrap();
    settle().await;

    tokio::time::advance(Duration::from_secs(14)).await;
    assert_eq!(shard.sweep(), 0);
    assert!(shard.contains(7));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(shard.sweep(), 1);
    assert!(!shard.contains(7));
    assert_eq!(shard.shutdown().await.evicted, 1);
}

#[tokio::test(start_paused = true)]
async fn activity_postpones_eviction() {
    let mut shard = Shard::new(0, cfg());
    for t in 0..3 {
        shard.route(&rec(7, t)).await.unwrap();
        settle().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(shard.sweep(), 0);
    }
    assert!(shard.contains(7));
    shard.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn record_after_eviction_starts_fresh_state() {
    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel();
    let (feed_tx, feed_rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = watch::channel(false);
    let shard = Shard::new(0, cfg()).with_observer(ev_tx);
    let task = tokio::spawn(shard.run(feed_rx, stop_rx));

    feed_tx.send(rec(42, 5)).await.unwrap();
    // sweeps tick every second; the session goes idle at 15s
    tokio::time::sleep(Duration::from_secs(16)).await;
    feed_tx.send(rec(42, 5)).await.unwrap();
    settle().await;
    stop_tx.send_replace(true);
    let report = task.await.unwrap();
    assert_eq!((report.created, report.evicted), (2, 1));

    let mut fresh = SessionState::default();
    fresh.apply(5, 1);
    let mut kinds = Vec::new();
    while let Ok(ev) = ev_rx.try_recv() {
        match ev {
            SessionEvent::Created { session, .. } => kinds.push(("created", session)),
            SessionEvent::Processed { session, fingerprint, .. } => {
                assert_eq!(fingerprint, fresh.fingerprint(), "state was resurrected");
                kinds.push(("processed", session));
            }
            SessionEvent::Destroyed { session, processed } => {
                assert_eq!(processed, 1);
                kinds.push(("destroyed", session));
            }
        }
    }
    assert_eq!(
        kinds,
        vec![
            ("created", 42),
            ("processed", 42),
            ("destroyed", 42),
            ("created", 42),
            ("processed", 42),
            ("destroyed", 42),
        ]
    );
}
