//! The per-session actor: one task draining one bounded queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::record::{Control, SessionId, SessionState};

/// Lifecycle notifications for an optional observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created { shard: usize, session: SessionId },
    Processed { session: SessionId, t: u64, clock: u64, fingerprint: u64 },
    Destroyed { session: SessionId, processed: u64 },
}

pub type EventSink = mpsc::UnboundedSender<SessionEvent>;

/// Milliseconds since the shard epoch, shared between the actor (writer)
/// and the shard sweep (reader).
#[derive(Debug, Clone)]
pub(crate) struct Activity {
    epoch: Instant,
    last_ms: Arc<AtomicU64>,
}

impl Activity {
    pub(crate) fn new(epoch: Instant) -> Self {
        let a = Self { epoch, last_ms: Arc::new(AtomicU64::new(0)) };
        a.touch();
        a
    }

    pub(crate) fn touch(&self) {
        let ms = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_ms.store(ms, Ordering::Relaxed);
    }

    pub(crate) fn idle_ms(&self, now: Instant) -> u64 {
        let now_ms = u64::try_from(now.saturating_duration_since(self.epoch).as_millis()).unwrap_or(u64::MAX);
        now_ms.saturating_sub(self.last_ms.load(Ordering::Relaxed))
    }
}

pub(crate) struct Actor {
    pub session: SessionId,
    pub rx: mpsc::Receiver<Control>,
    pub activity: Activity,
    pub processed_total: Arc<AtomicU64>,
    pub events: Option<EventSink>,
}

impl Actor {
    /// Drain until `Evict` or until the shard drops the sender.
    pub(crate) async fn run(mut self) -> u64 {
        let mut state = SessionState::default();
        let mut processed = 0u64;
        while let Some(ctl) = self.rx.recv().await {
            let rec = match ctl {
                Control::Data(rec) => rec,
                Control::Evict => break,
            };
            state.apply(rec.t, rec.dt);
            processed += 1;
            self.activity.touch();
            self.processed_total.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("session.inputs_processed_total").increment(1);
            if let Some(ev) = &self.events {
                let _ = ev.send(SessionEvent::Processed {
                    session: self.session,
                    t: rec.t,
                    clock: state.clock(),
                    fingerprint: state.fingerprint(),
                });
            }
            // fairness: sibling sessions on this shard run between our records
            tokio::task::yield_now().await;
        }
        if let Some(ev) = &self.events {
            let _ = ev.send(SessionEvent::Destroyed { session: self.session, processed });
        }
        tracing::trace!(session = self.session, processed, "session actor exited");
        processed
    }
}
