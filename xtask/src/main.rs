use ::index_server::grid_world;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use data_runtime::configs::{index_server, player_server, session, telemetry, zone_store};
use net_core::index::IndexMessage;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Parser)]
#[command(author, version, about = "Workspace automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// fmt + clippy -D warnings + tests + config check (workspace)
    Ci,
    /// Load every file under data/config and check the registry world fits one frame
    CheckConfig,
}

fn run(cmd: &mut Command) -> Result<()> {
    let status = cmd.status().context("spawn")?;
    if !status.success() {
        bail!("command failed: {:?}", cmd);
    }
    Ok(())
}

fn cargo(args: &[&str]) -> Result<()> {
    let mut c = Command::new("cargo");
    c.args(args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    run(&mut c)
}

fn ci() -> Result<()> {
    cargo(&["fmt", "--all"])?;
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
    cargo_deny()?;
    cargo(&["test", "--workspace"])?;
    check_config()?;
    Ok(())
}

fn cargo_deny() -> Result<()> {
    // Attempt to run `cargo deny check` if installed; otherwise warn and continue.
    let mut cmd = Command::new("cargo");
    cmd.args(["deny", "check"]).stdout(Stdio::inherit()).stderr(Stdio::inherit());
    match cmd.status() {
        Ok(status) => {
            if !status.success() {
                bail!("cargo deny check failed");
            }
        }
        Err(e) => {
            eprintln!("xtask: cargo-deny not found or failed to launch: {} (skipping)", e);
        }
    }
    Ok(())
}

fn check_config() -> Result<()> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data/config");
    let path = |name: &str| dir.join(format!("{name}.toml"));

    telemetry::load_from(&path("telemetry")).context("telemetry.toml")?;
    session::load_from(&path("session")).context("session.toml")?;
    zone_store::load_from(&path("zone_store")).context("zone_store.toml")?;
    player_server::load_from(&path("player_server")).context("player_server.toml")?;
    let index = index_server::load_from(&path("index_server")).context("index_server.toml")?;

    let g = index.grid;
    if g.nx == 0 || g.ny == 0 || g.nz == 0 || g.cell_size_m <= 0 {
        bail!("index_server.toml: grid {:?} is empty", g);
    }
    let world = grid_world(&g).context("index_server.toml")?;
    let payload = IndexMessage::WorldResponse { world: world.to_bytes() }
        .to_payload()
        .with_context(|| format!("index_server.toml: {} zones do not fit one world packet", world.len()))?;
    let bytes = payload.len();
    println!("xtask: config ok ({} zones, world packet {} bytes)", world.len(), bytes);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Ci => ci(),
        Cmd::CheckConfig => check_config(),
    }
}
