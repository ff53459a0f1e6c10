//! load_client: drive a cluster with simulated players.
//!
//! Usage:
//!   cargo run --bin load_client -- zone-store --addr 127.0.0.1:50000 --players 250
//!   cargo run --bin load_client -- udp --addr 127.0.0.1:40000 --sessions 16

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use zoneshard::client::{UdpInputClient, ZoneStoreClient};
use zoneshard::data::configs::telemetry;
use zoneshard::net::udp::INPUT_BYTES;
use zoneshard::net::zone_db::PLAYER_STATE_BYTES;
use zoneshard::server::telemetry::init_telemetry;

#[derive(Parser, Debug)]
#[command(about = "Cluster load generator")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
    /// Run time in seconds
    #[arg(long, default_value_t = 10, global = true)]
    seconds: u64,
    /// Send interval per simulated player, milliseconds
    #[arg(long, default_value_t = 10, global = true)]
    interval_ms: u64,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Push player state frames to a zone store
    ZoneStore {
        #[arg(long, default_value = "127.0.0.1:50000")]
        addr: SocketAddr,
        #[arg(long, default_value_t = 250)]
        players: u64,
    },
    /// Join a player server over UDP and stream inputs
    Udp {
        #[arg(long, default_value = "127.0.0.1:40000")]
        addr: SocketAddr,
        #[arg(long, default_value_t = 16)]
        sessions: u64,
    },
}

async fn push_states(addr: SocketAddr, session: u64, every: Duration, until: Instant) -> Result<u64> {
    let mut client = ZoneStoreClient::connect(addr).await.context("connect zone store")?;
    client.ping().await.context("ping zone store")?;
    let mut state = [0u8; PLAYER_STATE_BYTES];
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();
    let mut frame = 0u64;
    while Instant::now() < until {
        ticker.tick().await;
        rand::thread_rng().fill(&mut state[..]);
        let sim_time = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        client.push_state(session, frame, sim_time, &state).await?;
        frame += 1;
    }
    client.close().await?;
    Ok(frame)
}

async fn stream_inputs(addr: SocketAddr, session: u64, every: Duration, until: Instant) -> Result<u64> {
    let mut client = UdpInputClient::connect(addr, session).await?;
    let ack = tokio::time::timeout(Duration::from_secs(5), client.join(&session.to_le_bytes()))
        .await
        .context("join timed out")??;
    tracing::debug!(session, rtt_us = ack.rtt.as_micros() as u64, "joined");
    let dt = u64::try_from(every.as_micros()).unwrap_or(u64::MAX);
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent = 0u64;
    while Instant::now() < until {
        ticker.tick().await;
        let mut input = [0u8; INPUT_BYTES];
        rand::thread_rng().fill(&mut input[..]);
        client.send_input(dt, input).await?;
        sent += 1;
    }
    Ok(sent)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(&telemetry::load_default()?)?;
    let every = Duration::from_millis(args.interval_ms.max(1));
    let until = Instant::now() + Duration::from_secs(args.seconds);

    let mut tasks = JoinSet::new();
    match args.cmd {
        Cmd::ZoneStore { addr, players } => {
            tracing::info!(%addr, players, "pushing player state");
            for session in 0..players {
                tasks.spawn(push_states(addr, session, every, until));
            }
        }
        Cmd::Udp { addr, sessions } => {
            tracing::info!(%addr, sessions, "streaming inputs");
            for session in 1..=sessions {
                tasks.spawn(stream_inputs(addr, session, every, until));
            }
        }
    }

    let (mut sent, mut failed) = (0u64, 0u64);
    while let Some(done) = tasks.join_next().await {
        match done.context("load task")? {
            Ok(n) => sent += n,
            Err(e) => {
                failed += 1;
                tracing::warn!(error = %e, "simulated player failed");
            }
        }
    }
    tracing::info!(sent, failed, "load finished");
    Ok(())
}
