//! One shard: the routing table plus the actors it owns.
//!
//! The table is an arena of slots addressed by generation-checked handles,
//! with a side map from session id to handle. A shard is driven by exactly
//! one task, so none of this is locked.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use data_runtime::configs::session::SessionCfg;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::actor::{Activity, Actor, EventSink, SessionEvent};
use crate::record::{Control, InputRecord, RecordError, SessionId};

/// The injected ingestion point a shard drains. `None` means the producer
/// is gone and the shard should stop.
pub trait RecordSource {
    fn next_record(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

impl RecordSource for mpsc::Receiver<Vec<u8>> {
    fn next_record(&mut self) -> impl Future<Output = Option<Vec<u8>>> + Send {
        self.recv()
    }
}

#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub queue_capacity: usize,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub shutdown_grace: Duration,
}

impl From<&SessionCfg> for ShardConfig {
    fn from(c: &SessionCfg) -> Self {
        Self {
            queue_capacity: c.queue_capacity.max(1),
            idle_timeout: c.idle_timeout(),
            sweep_interval: c.sweep_interval(),
            shutdown_grace: c.shutdown_grace(),
        }
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self::from(&SessionCfg::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: u32,
    generation: u32,
}

struct Live {
    session: SessionId,
    tx: mpsc::Sender<Control>,
    activity: Activity,
    task: JoinHandle<u64>,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    live: Option<Live>,
}

/// Counters reported when a shard stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShardReport {
    pub shard: usize,
    pub created: u64,
    pub evicted: u64,
    pub rejected: u64,
    pub processed: u64,
    /// Sessions still live at shutdown that finished within the grace window.
    pub drained: u64,
    /// Sessions aborted because the grace window ran out.
    pub aborted: u64,
}

pub struct Shard {
    id: usize,
    cfg: ShardConfig,
    epoch: Instant,
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_session: HashMap<SessionId, SlotHandle>,
    processed: Arc<AtomicU64>,
    events: Option<EventSink>,
    report: ShardReport,
}

impl Shard {
    pub fn new(id: usize, cfg: ShardConfig) -> Self {
        Self {
            id,
            cfg,
            epoch: Instant::now(),
            slots: Vec::new(),
            free: Vec::new(),
            by_session: HashMap::new(),
            processed: Arc::new(AtomicU64::new(0)),
            events: None,
            report: ShardReport { shard: id, ..Default::default() },
        }
    }

    pub fn with_observer(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_session.is_empty()
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.by_session.contains_key(&session)
    }

    pub fn handle_of(&self, session: SessionId) -> Option<SlotHandle> {
        self.by_session.get(&session).copied()
    }

    /// Live entry behind `h`, or `None` if the handle is stale.
    fn live(&self, h: SlotHandle) -> Option<&Live> {
        let slot = self.slots.get(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        slot.live.as_ref()
    }

    /// Parse a raw record and route it. Wrong-length records are rejected
    /// and never reach an actor.
    pub async fn route(&mut self, bytes: &[u8]) -> Result<(), RecordError> {
        match InputRecord::parse(bytes) {
            Ok(rec) => {
                self.route_record(rec).await;
                Ok(())
            }
            Err(e) => {
                self.report.rejected += 1;
                metrics::counter!("session.records_rejected_total").increment(1);
                Err(e)
            }
        }
    }

    /// Enqueue into the session's actor, creating it on first sight. Waits
    /// while that actor's queue is full.
    pub async fn route_record(&mut self, rec: InputRecord) {
        let session = rec.session;
        let h = match self.handle_of(session) {
            Some(h) => h,
            None => self.create(session),
        };
        let Some(tx) = self.live(h).map(|l| l.tx.clone()) else {
            return;
        };
        if tx.send(Control::Data(rec)).await.is_err() {
            // actor already gone; the next record recreates it
            warn!(shard = self.id, session, "session actor closed its queue");
            self.destroy(session);
        }
    }

    fn create(&mut self, session: SessionId) -> SlotHandle {
        let (tx, rx) = mpsc::channel(self.cfg.queue_capacity);
        let activity = Activity::new(self.epoch);
        let actor = Actor {
            session,
            rx,
            activity: activity.clone(),
            processed_total: self.processed.clone(),
            events: self.events.clone(),
        };
        let task = tokio::spawn(actor.run());
        let live = Live { session, tx, activity, task };

        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        slot.live = Some(live);
        let h = SlotHandle { index, generation: slot.generation };
        self.by_session.insert(session, h);

        self.report.created += 1;
        metrics::gauge!("session.sessions_active").increment(1.0);
        if let Some(ev) = &self.events {
            let _ = ev.send(SessionEvent::Created { shard: self.id, session });
        }
        debug!(shard = self.id, session, "session created");
        h
    }

    /// Remove from the table and tell the actor to stop. Returns its task.
    fn destroy(&mut self, session: SessionId) -> Option<JoinHandle<u64>> {
        let h = self.by_session.remove(&session)?;
        let slot = self.slots.get_mut(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        let live = slot.live.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        // a full queue still closes: dropping `tx` ends the actor after its backlog
        let _ = live.tx.try_send(Control::Evict);
        metrics::gauge!("session.sessions_active").decrement(1.0);
        Some(live.task)
    }

    /// Evict every session idle for at least the timeout. Returns how many.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let limit = u64::try_from(self.cfg.idle_timeout.as_millis()).unwrap_or(u64::MAX);
        let idle: Vec<SessionId> = self
            .slots
            .iter()
            .filter_map(|s| s.live.as_ref())
            .filter(|l| l.activity.idle_ms(now) >= limit)
            .map(|l| l.session)
            .collect();
        for &session in &idle {
            // detached: the actor exits on Evict
            drop(self.destroy(session));
            debug!(shard = self.id, session, "session evicted");
        }
        let n = idle.len();
        if n > 0 {
            self.report.evicted += n as u64;
            metrics::counter!("session.evictions_total").increment(n as u64);
        }
        n
    }

    /// Drain `source` until it ends or `shutdown` flips, sweeping on the
    /// configured interval. Finishes with a graceful shutdown.
    pub async fn run<S: RecordSource>(mut self, mut source: S, mut shutdown: watch::Receiver<bool>) -> ShardReport {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.cfg.sweep_interval, self.cfg.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
                _ = ticker.tick() => {
                    self.sweep();
                }
                rec = source.next_record() => match rec {
                    Some(bytes) => {
                        if let Err(e) = self.route(&bytes).await {
                            warn!(shard = self.id, error = %e, "dropping malformed record");
                        }
                    }
                    None => break,
                },
            }
        }
        self.shutdown().await
    }

    /// Stop every actor, give them `shutdown_grace` to finish what is
    /// queued, then abort the rest.
    pub async fn shutdown(mut self) -> ShardReport {
        let sessions: Vec<SessionId> = self.by_session.keys().copied().collect();
        let mut tasks: Vec<JoinHandle<u64>> = sessions.into_iter().filter_map(|s| self.destroy(s)).collect();
        let deadline = Instant::now() + self.cfg.shutdown_grace;
        for task in &mut tasks {
            match tokio::time::timeout_at(deadline, &mut *task).await {
                Ok(_) => self.report.drained += 1,
                Err(_) => {
                    task.abort();
                    self.report.aborted += 1;
                }
            }
        }
        self.report.processed = self.processed.load(Ordering::Relaxed);
        info!(
            shard = self.id,
            created = self.report.created,
            evicted = self.report.evicted,
            processed = self.report.processed,
            drained = self.report.drained,
            aborted = self.report.aborted,
            "shard stopped"
        );
        self.report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::record::INPUT_BYTES;

    fn rec(session: u64, t: u64) -> InputRecord {
        InputRecord { session, t, dt: 1, payload: [0; INPUT_BYTES] }
    }

    fn cfg() -> ShardConfig {
        ShardConfig {
            queue_capacity: 16,
            idle_timeout: Duration::from_secs(15),
            sweep_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn creates_on_first_record_and_reuses_slots() {
        let mut shard = Shard::new(0, cfg());
        shard.route_record(rec(1, 0)).await;
        shard.route_record(rec(1, 1)).await;
        assert_eq!(shard.len(), 1);
        let h1 = shard.handle_of(1).unwrap();
        drop(shard.destroy(1));
        assert!(shard.live(h1).is_none(), "stale handle must not resolve");
        shard.route_record(rec(2, 0)).await;
        let h2 = shard.handle_of(2).unwrap();
        assert_eq!(h2.index, h1.index);
        assert_ne!(h2.generation, h1.generation);
        let report = shard.shutdown().await;
        assert_eq!(report.created, 2);
    }

    #[tokio::test]
    async fn malformed_records_are_rejected_not_fatal() {
        let mut shard = Shard::new(0, cfg());
        let mut bytes = rec(5, 0).to_bytes();
        bytes.pop();
        assert!(shard.route(&bytes).await.is_err());
        assert!(shard.is_empty());
        shard.route(&rec(5, 0).to_bytes()).await.unwrap();
        assert!(shard.contains(5));
        let report = shard.shutdown().await;
        assert_eq!(report.rejected, 1);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_records() {
        let mut shard = Shard::new(3, cfg());
        for t in 0..10 {
            shard.route_record(rec(9, t)).await;
        }
        let report = shard.shutdown().await;
        assert_eq!(report.shard, 3);
        assert_eq!(report.processed, 10);
        assert_eq!((report.drained, report.aborted), (1, 0));
    }
}
