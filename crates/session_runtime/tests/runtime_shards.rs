use session_runtime::{InputRecord, IngestError, SessionEvent, SessionRuntime, INPUT_BYTES};
use data_runtime::configs::session::SessionCfg;

#[test]
fn records_route_by_session_modulo_shards() {
    let cfg = SessionCfg { shards: 2, ..Default::default() };
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let rt = SessionRuntime::start_with_observer(&cfg, tx).unwrap();
    assert_eq!(rt.shard_count(), 2);
    let ingest = rt.ingest();
    for session in 0..6u64 {
        for t in 0..5 {
            let r = InputRecord { session, t, dt: 1, payload: [0; INPUT_BYTES] };
            ingest.send_blocking(r.to_bytes()).unwrap();
        }
    }
    assert!(matches!(ingest.send_blocking(vec![1, 2, 3]), Err(IngestError::Record(_))));

    let mut processed = 0;
    while processed < 30 {
        match rx.blocking_recv().expect("event stream open") {
            SessionEvent::Created { shard, session } => assert_eq!(shard as u64, session % 2),
            SessionEvent::Processed { .. } => processed += 1,
            SessionEvent::Destroyed { .. } => {}
        }
    }
    let reports = rt.shutdown();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports.iter().map(|r| r.processed).sum::<u64>(), 30);
    assert_eq!(reports.iter().map(|r| r.created).sum::<u64>(), 6);
    assert!(reports.iter().all(|r| r.aborted == 0));
}
