//! Registration with the registry, the cached world and the peer list.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use client_core::IndexClient;
use data_runtime::configs::player_server::PlayerServerCfg;
use net_core::index::ServerData;
use server_core::{listener, Shutdown, ShutdownSignal};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use world_core::{Vector, World, WorldGrid, METER};

use crate::handler::handle_connection;

type Peers = Arc<RwLock<Vec<ServerData>>>;

pub struct PlayerServerNode {
    id: u32,
    world: Arc<World>,
    grid: WorldGrid,
    peers: Peers,
    index: Arc<Mutex<IndexClient>>,
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl PlayerServerNode {
    /// Ping, register, fetch the world, then start the refresh task and the
    /// TCP listener. Any registry failure aborts startup.
    pub async fn connect(cfg: &PlayerServerCfg) -> Result<Self> {
        let mut index = IndexClient::connect(cfg.index_addr)
            .await
            .with_context(|| format!("connect to index server {}", cfg.index_addr))?;
        index.ping().await.context("ping index server")?;
        let id = index.connect_player_server().await.context("register player server")?;
        tracing::info!(id = format_args!("0x{id:08x}"), "registered with index server");

        let world = index.request_world().await.context("fetch world")?;
        tracing::info!(zones = world.len(), "world received");
        let grid = WorldGrid::build(&world, cfg.lookup_cell_m.saturating_mul(METER))
            .context("build zone lookup grid")?;
        let peers = index.update_player_servers().await.context("fetch peer list")?;

        let listener = TcpListener::bind(cfg.bind_addr)
            .await
            .with_context(|| format!("bind {}", cfg.bind_addr))?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "player server listening");

        let (shutdown, signal) = Shutdown::new();
        let index = Arc::new(Mutex::new(index));
        let peers: Peers = Arc::new(RwLock::new(peers));
        let tasks = vec![
            tokio::spawn(listener::serve(listener, signal.clone(), handle_connection::<TcpStream>)),
            tokio::spawn(refresh_peers(index.clone(), peers.clone(), cfg.refresh_interval(), signal)),
        ];
        Ok(Self { id, world: Arc::new(world), grid, peers, index, local_addr, shutdown, tasks })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn zone_for(&self, p: Vector) -> Option<u32> {
        self.grid.find_zone_id(&self.world, p)
    }

    /// Last peer list received from the registry (includes this server).
    pub fn peers(&self) -> Vec<ServerData> {
        self.peers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Stop the listener and refresher, then deregister.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown.trigger();
        for t in self.tasks {
            let _ = t.await;
        }
        let mut index = self.index.lock().await;
        index.disconnect_player_server().await.context("deregister player server")?;
        tracing::info!(id = format_args!("0x{:08x}", self.id), "deregistered from index server");
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.shutdown.trigger_on_ctrl_c();
        let mut sig = self.shutdown.signal();
        sig.wait().await;
        self.shutdown().await
    }
}

async fn refresh_peers(
    index: Arc<Mutex<IndexClient>>,
    peers: Peers,
    every: Duration,
    mut stop: ShutdownSignal,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick is immediate and connect() already fetched the list
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = ticker.tick() => {}
        }
        let fresh = index.lock().await.update_player_servers().await;
        match fresh {
            Ok(list) => {
                metrics::gauge!("player_server.peers").set(list.len() as f64);
                *peers.write().unwrap_or_else(PoisonError::into_inner) = list;
            }
            Err(e) => tracing::warn!(error = %e, "peer refresh failed"),
        }
    }
}
