//! Registry process wiring: listener, handlers and the liveness reaper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use data_runtime::configs::index_server::{GridCfg, IndexServerCfg};
use net_core::frame::HEADER_BYTES;
use net_core::index::{IndexMessage, MAX_WORLD_PACKET_SIZE};
use server_core::{listener, Shutdown, ShutdownSignal};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use world_core::{generate_grid_world, grid_world_encoded_len, World, METER};

use crate::handler::{handle_connection, HandlerCtx};
use crate::registry::Registry;

pub struct IndexServer {
    ctx: Arc<HandlerCtx>,
    cfg: IndexServerCfg,
}

/// A bound, running registry.
pub struct IndexServerHandle {
    local_addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl IndexServer {
    /// Fails when the world does not fit one `WorldResponse` frame.
    pub fn new(world: World, cfg: IndexServerCfg) -> Result<Self> {
        let world_payload = IndexMessage::WorldResponse { world: world.to_bytes() }
            .to_payload()
            .context("world does not fit in one frame")?;
        tracing::info!(zones = world.len(), bytes = world_payload.len(), "registry world ready");
        let registry =
            Arc::new(Registry::new(Arc::new(world)).with_reaping(cfg.reap_grace_secs > 0));
        let ctx = HandlerCtx { registry, world_payload, explicit_nacks: cfg.explicit_nacks };
        Ok(Self { ctx: Arc::new(ctx), cfg })
    }

    /// Generate the configured grid world and build the server around it.
    pub fn from_config(cfg: IndexServerCfg) -> Result<Self> {
        let world = grid_world(&cfg.grid)?;
        for line in world.summary().lines() {
            tracing::debug!("{line}");
        }
        Self::new(world, cfg)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.ctx.registry
    }

    pub async fn bind(self, addr: SocketAddr) -> Result<IndexServerHandle> {
        let listener = TcpListener::bind(addr).await.with_context(|| format!("bind {addr}"))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "index server listening");
        let (shutdown, signal) = Shutdown::new();
        let mut tasks = Vec::new();

        let ctx = self.ctx.clone();
        tasks.push(tokio::spawn(listener::serve(listener, signal.clone(), move |stream, peer| {
            handle_connection(ctx.clone(), stream, peer)
        })));

        if self.cfg.reap_grace_secs > 0 {
            tasks.push(tokio::spawn(reaper(
                self.ctx.registry.clone(),
                Duration::from_secs(self.cfg.reap_grace_secs),
                Duration::from_millis(self.cfg.reap_interval_ms.max(1)),
                signal,
            )));
        }
        Ok(IndexServerHandle { local_addr, registry: self.ctx.registry.clone(), shutdown, tasks })
    }
}

/// Generate the grid world `g` describes. Fails without allocating when
/// the extents overflow or the world could not fit one `WorldResponse`.
pub fn grid_world(g: &GridCfg) -> Result<World> {
    let cell = g
        .cell_size_m
        .checked_mul(METER)
        .filter(|c| *c > 0)
        .with_context(|| format!("grid cell size {} m is out of range", g.cell_size_m))?;
    for n in [g.nx, g.ny, g.nz] {
        if i64::from(n).checked_mul(cell).is_none() {
            bail!("grid extent {n} x {} m overflows", g.cell_size_m);
        }
    }
    let packet = grid_world_encoded_len(g.nx, g.ny, g.nz)
        .and_then(|len| len.checked_add(HEADER_BYTES + 1))
        .filter(|len| *len <= MAX_WORLD_PACKET_SIZE)
        .with_context(|| {
            let (nx, ny, nz) = (g.nx, g.ny, g.nz);
            format!("{nx}x{ny}x{nz} grid does not fit one {MAX_WORLD_PACKET_SIZE} byte world packet")
        })?;
    tracing::debug!(packet, "grid world size checked");
    Ok(generate_grid_world(g.nx, g.ny, g.nz, cell))
}

async fn reaper(registry: Arc<Registry>, grace: Duration, every: Duration, mut stop: ShutdownSignal) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = ticker.tick() => {}
        }
        let report = registry.reap(grace).await;
        for s in &report.player_servers {
            tracing::info!(peer = %s.addr, id = format_args!("0x{:08x}", s.id), "reaped player server");
        }
        for s in &report.leases {
            tracing::info!(peer = %s.addr, zone_id = s.id, "reaped zone lease");
        }
        if !report.is_empty() {
            metrics::counter!("index.reaped_total")
                .increment((report.player_servers.len() + report.leases.len()) as u64);
        }
    }
}

impl IndexServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Stop accepting, end the reaper and wait for both.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        for t in self.tasks {
            let _ = t.await;
        }
        tracing::info!(addr = %self.local_addr, "index server stopped");
    }

    /// Wait until an external signal (Ctrl-C) stops the server.
    pub async fn run_until_ctrl_c(self) {
        self.shutdown.trigger_on_ctrl_c();
        let mut sig = self.shutdown.signal();
        sig.wait().await;
        self.shutdown().await;
    }
}
