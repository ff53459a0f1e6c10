//! Multi-shard runtime: one OS thread per shard, each running its own
//! single-threaded tokio scheduler.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use data_runtime::configs::session::SessionCfg;
use tokio::sync::{mpsc, watch};

use crate::actor::EventSink;
use crate::record::{peek_session, RecordError, SessionId};
use crate::shard::{Shard, ShardConfig, ShardReport};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("shard {0} is no longer accepting records")]
    Closed(usize),
}

/// Cloneable producer handle; routes each record to shard `session % shards`.
#[derive(Clone)]
pub struct Ingest {
    shards: Arc<[mpsc::Sender<Vec<u8>>]>,
}

impl Ingest {
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_for(&self, session: SessionId) -> usize {
        (session % self.shards.len() as u64) as usize
    }

    /// Waits while the target shard's feed is full.
    pub async fn send(&self, record: Vec<u8>) -> Result<(), IngestError> {
        let i = self.shard_for(peek_session(&record)?);
        self.shards[i].send(record).await.map_err(|_| IngestError::Closed(i))
    }

    /// Blocking variant for producers outside any async runtime.
    pub fn send_blocking(&self, record: Vec<u8>) -> Result<(), IngestError> {
        let i = self.shard_for(peek_session(&record)?);
        self.shards[i].blocking_send(record).map_err(|_| IngestError::Closed(i))
    }
}

pub struct SessionRuntime {
    ingest: Ingest,
    stop: watch::Sender<bool>,
    threads: Vec<JoinHandle<ShardReport>>,
}

impl SessionRuntime {
    pub fn start(cfg: &SessionCfg) -> Result<Self> {
        Self::start_inner(cfg, None)
    }

    /// Like `start`, streaming every lifecycle event into `events`.
    pub fn start_with_observer(cfg: &SessionCfg, events: EventSink) -> Result<Self> {
        Self::start_inner(cfg, Some(events))
    }

    fn start_inner(cfg: &SessionCfg, events: Option<EventSink>) -> Result<Self> {
        let n = cfg.effective_shards();
        let shard_cfg = ShardConfig::from(cfg);
        let (stop, stop_rx) = watch::channel(false);
        let mut senders = Vec::with_capacity(n);
        let mut threads = Vec::with_capacity(n);
        for id in 0..n {
            let (tx, rx) = mpsc::channel::<Vec<u8>>(cfg.feed_capacity.max(1));
            senders.push(tx);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("build shard runtime")?;
            let mut shard = Shard::new(id, shard_cfg.clone());
            if let Some(ev) = &events {
                shard = shard.with_observer(ev.clone());
            }
            let stop_rx = stop_rx.clone();
            let t = std::thread::Builder::new()
                .name(format!("session-shard-{id}"))
                .spawn(move || rt.block_on(shard.run(rx, stop_rx)))
                .with_context(|| format!("spawn shard thread {id}"))?;
            threads.push(t);
        }
        tracing::info!(shards = n, queue = shard_cfg.queue_capacity, "session runtime started");
        Ok(Self { ingest: Ingest { shards: senders.into() }, stop, threads })
    }

    pub fn ingest(&self) -> Ingest {
        self.ingest.clone()
    }

    pub fn shard_count(&self) -> usize {
        self.threads.len()
    }

    /// Signal every shard, wait for the graceful drains and collect reports.
    /// Blocks the calling thread; from async code run it on a blocking task.
    pub fn shutdown(self) -> Vec<ShardReport> {
        self.stop.send_replace(true);
        drop(self.ingest);
        self.threads
            .into_iter()
            .enumerate()
            .map(|(id, t)| {
                t.join().unwrap_or_else(|_| {
                    tracing::error!(shard = id, "shard thread panicked");
                    ShardReport { shard: id, ..Default::default() }
                })
            })
            .collect()
    }
}
