//! index_server: the registry. Generates the grid world, serves it, leases
//! zones and tracks player servers.
//!
//! Usage:
//!   cargo run --bin index_server -- --bind 0.0.0.0:60000 --grid 4x1x4

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use zoneshard::data::configs::{index_server, telemetry};
use zoneshard::index::IndexServer;
use zoneshard::server::telemetry::init_telemetry;

#[derive(Parser, Debug)]
#[command(about = "Zone registry server")]
struct Args {
    /// Config file (default: data/config/index_server.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Grid world size as NXxNYxNZ
    #[arg(long)]
    grid: Option<String>,
    /// Zone edge length in meters
    #[arg(long)]
    cell_size_m: Option<i64>,
    /// Close the connection instead of answering RequestFailed
    #[arg(long)]
    silent_refusals: bool,
}

fn parse_grid(s: &str) -> Result<(u32, u32, u32)> {
    let parts: Vec<&str> = s.split('x').collect();
    let &[x, y, z] = parts.as_slice() else {
        bail!("grid must look like 2x1x2, got '{s}'");
    };
    let n = |v: &str| v.parse::<u32>().with_context(|| format!("grid axis '{v}'"));
    Ok((n(x)?, n(y)?, n(z)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _telemetry = init_telemetry(&telemetry::load_default()?)?;

    let mut cfg = match &args.config {
        Some(p) => index_server::load_from(p)?,
        None => index_server::load_default()?,
    };
    if let Some(b) = args.bind {
        cfg.bind_addr = b;
    }
    if let Some(g) = &args.grid {
        (cfg.grid.nx, cfg.grid.ny, cfg.grid.nz) = parse_grid(g)?;
    }
    if let Some(c) = args.cell_size_m {
        cfg.grid.cell_size_m = c;
    }
    if args.silent_refusals {
        cfg.explicit_nacks = false;
    }

    let bind = cfg.bind_addr;
    let server = IndexServer::from_config(cfg)?;
    server.bind(bind).await?.run_until_ctrl_c().await;
    Ok(())
}
