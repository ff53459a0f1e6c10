//! zone_store: lease a zone from the registry and keep per-player state
//! history for it.
//!
//! Usage:
//!   cargo run --bin zone_store -- --bind 127.0.0.1:50001 --zone 2

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use zoneshard::data::configs::{telemetry, zone_store};
use zoneshard::server::telemetry::init_telemetry;
use zoneshard::store::ZoneStoreNode;

#[derive(Parser, Debug)]
#[command(about = "Zone state store")]
struct Args {
    /// Config file (default: data/config/zone_store.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Registry address
    #[arg(long)]
    index: Option<SocketAddr>,
    /// Zone id to lease; 0 takes any free zone
    #[arg(long)]
    zone: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(&telemetry::load_default()?)?;

    let mut cfg = match &args.config {
        Some(p) => zone_store::load_from(p)?,
        None => zone_store::load_default()?,
    };
    if let Some(b) = args.bind {
        cfg.bind_addr = b;
    }
    if let Some(i) = args.index {
        cfg.index_addr = i;
    }
    if let Some(z) = args.zone {
        cfg.requested_zone = z;
    }

    ZoneStoreNode::start(&cfg).await?.run_until_ctrl_c().await
}
