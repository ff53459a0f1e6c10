//! A running zone store: lease from the registry, then serve.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use client_core::IndexClient;
use data_runtime::configs::zone_store::ZoneStoreCfg;
use server_core::{listener, Shutdown, ShutdownSignal};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::store::ZoneStore;

pub struct ZoneStoreNode {
    zone_id: u32,
    local_addr: SocketAddr,
    store: Arc<ZoneStore>,
    index: IndexClient,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl ZoneStoreNode {
    /// Fails (and serves nothing) when the registry grants no lease.
    pub async fn start(cfg: &ZoneStoreCfg) -> Result<Self> {
        let mut index = IndexClient::connect(cfg.index_addr)
            .await
            .with_context(|| format!("connect to index server {}", cfg.index_addr))?;
        index.ping().await.context("ping index server")?;
        let zone_id = index
            .lease_zone(cfg.requested_zone)
            .await
            .with_context(|| format!("lease zone (requested {})", cfg.requested_zone))?;
        tracing::info!(zone_id, "zone lease granted");

        let listener = TcpListener::bind(cfg.bind_addr)
            .await
            .with_context(|| format!("bind {}", cfg.bind_addr))?;
        let local_addr = listener.local_addr()?;
        let store = Arc::new(ZoneStore::new(cfg.history_size));
        let (shutdown, signal) = Shutdown::new();
        let mut tasks = Vec::new();
        if cfg.idle_timeout_secs > 0 {
            tasks.push(tokio::spawn(evict_idle(
                store.clone(),
                cfg.idle_timeout(),
                cfg.sweep_interval(),
                signal.clone(),
            )));
        }
        let s = store.clone();
        tasks.push(tokio::spawn(listener::serve(listener, signal, move |stream, peer| {
            handle_connection(s.clone(), stream, peer)
        })));
        tracing::info!(%local_addr, zone_id, "zone store listening");
        Ok(Self { zone_id, local_addr, store, index, shutdown, tasks })
    }

    pub fn zone_id(&self) -> u32 {
        self.zone_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn store(&self) -> &Arc<ZoneStore> {
        &self.store
    }

    /// Stop serving and hand the zone back to the registry.
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown.trigger();
        for t in self.tasks.drain(..) {
            let _ = t.await;
        }
        self.index.release_zone().await.context("release zone lease")?;
        tracing::info!(zone_id = self.zone_id, "zone lease released");
        self.index.close().await?;
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.shutdown.trigger_on_ctrl_c();
        let mut sig = self.shutdown.signal();
        sig.wait().await;
        self.shutdown().await
    }
}

async fn evict_idle(store: Arc<ZoneStore>, idle: Duration, every: Duration, mut stop: ShutdownSignal) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = stop.wait() => break,
            _ = ticker.tick() => {}
        }
        let n = store.evict_idle(idle);
        if n > 0 {
            tracing::debug!(evicted = n, remaining = store.session_count(), "evicted idle player histories");
            metrics::counter!("zone_store.histories_evicted_total").increment(n as u64);
        }
    }
}
