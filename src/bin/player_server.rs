//! player_server: register with the registry, then accept client input over
//! UDP and run it through the session runtime.
//!
//! Usage:
//!   cargo run --bin player_server -- --udp 0.0.0.0:40000 --shards 4

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use zoneshard::data::configs::{player_server, session, telemetry};
use zoneshard::player::{Frontend, PlayerServerNode};
use zoneshard::server::telemetry::init_telemetry;
use zoneshard::session::SessionRuntime;

#[derive(Parser, Debug)]
#[command(about = "Player-facing server")]
struct Args {
    /// Config file (default: data/config/player_server.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Session runtime config (default: data/config/session.toml)
    #[arg(long)]
    session_config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    #[arg(long)]
    udp: Option<SocketAddr>,
    /// Registry address
    #[arg(long)]
    index: Option<SocketAddr>,
    #[arg(long)]
    shards: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(&telemetry::load_default()?)?;

    let mut cfg = match &args.config {
        Some(p) => player_server::load_from(p)?,
        None => player_server::load_default()?,
    };
    if let Some(b) = args.bind {
        cfg.bind_addr = b;
    }
    if let Some(u) = args.udp {
        cfg.udp_addr = u;
    }
    if let Some(i) = args.index {
        cfg.index_addr = i;
    }
    let mut session_cfg = match &args.session_config {
        Some(p) => session::load_from(p)?,
        None => session::load_default()?,
    };
    if let Some(n) = args.shards {
        session_cfg.shards = n;
    }

    let runtime = SessionRuntime::start(&session_cfg)?;
    let node = PlayerServerNode::connect(&cfg).await?;
    let frontend = Frontend::bind(cfg.udp_addr, runtime.ingest())
        .await?
        .with_idle_sweep(session_cfg.idle_timeout(), session_cfg.sweep_interval());
    let frontend = tokio::spawn(frontend.run(node.shutdown_signal()));

    node.run_until_ctrl_c().await?;
    let report = frontend.await.context("udp frontend task")?;
    let shards = tokio::task::spawn_blocking(move || runtime.shutdown())
        .await
        .context("session runtime shutdown")?;
    tracing::info!(
        joins = report.joins,
        forwarded = report.forwarded,
        processed = shards.iter().map(|s| s.processed).sum::<u64>(),
        sessions = shards.iter().map(|s| s.created).sum::<u64>(),
        "player server stopped"
    );
    Ok(())
}
