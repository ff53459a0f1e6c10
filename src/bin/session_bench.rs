//! session_bench: run the synthetic feed through the session runtime and
//! report per-shard throughput.
//!
//! Usage:
//!   cargo run --release --bin session_bench -- --sessions 250 --rounds 100 --seconds 10

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::time::Instant;
use zoneshard::data::configs::{session, telemetry};
use zoneshard::server::telemetry::init_telemetry;
use zoneshard::session::{SessionRuntime, SyntheticFeed};

#[derive(Parser, Debug)]
#[command(about = "Synthetic load for the session runtime")]
struct Args {
    #[arg(long, default_value_t = 250)]
    sessions: u64,
    #[arg(long, default_value_t = 100)]
    rounds: u32,
    #[arg(long, default_value_t = 1000)]
    tick_ms: u64,
    #[arg(long, default_value_t = 10)]
    seconds: u64,
    /// Overrides data/config/session.toml
    #[arg(long)]
    shards: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(&telemetry::load_default()?)?;
    let mut cfg = session::load_default()?;
    if let Some(n) = args.shards {
        cfg.shards = n;
    }

    let runtime = SessionRuntime::start(&cfg)?;
    let feed = SyntheticFeed::new(args.sessions, args.rounds, Duration::from_millis(args.tick_ms.max(1)));
    let (stop, stop_rx) = tokio::sync::watch::channel(false);
    let started = Instant::now();
    let producer = tokio::spawn(feed.run(runtime.ingest(), stop_rx));

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.seconds)) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    stop.send_replace(true);
    let sent = producer.await.context("feed task")??;
    let reports = tokio::task::spawn_blocking(move || runtime.shutdown())
        .await
        .context("session runtime shutdown")?;
    let secs = started.elapsed().as_secs_f64().max(f64::EPSILON);

    for r in &reports {
        tracing::info!(
            shard = r.shard,
            created = r.created,
            evicted = r.evicted,
            processed = r.processed,
            drained = r.drained,
            aborted = r.aborted,
            "shard report"
        );
    }
    let processed: u64 = reports.iter().map(|r| r.processed).sum();
    tracing::info!(sent, processed, per_sec = (processed as f64 / secs) as u64, "bench finished");
    Ok(())
}
