//! Synthetic load: every tick, `rounds` passes over `sessions` session ids,
//! one record each, all stamped with the current tick's `t`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::record::{InputRecord, INPUT_BYTES};
use crate::runtime::{Ingest, IngestError};

#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    pub sessions: u64,
    pub rounds: u32,
    pub tick: Duration,
    pub dt: u64,
    t: u64,
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self::new(250, 100, Duration::from_secs(1))
    }
}

impl SyntheticFeed {
    pub fn new(sessions: u64, rounds: u32, tick: Duration) -> Self {
        Self { sessions, rounds, tick, dt: 1, t: 0 }
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    /// Records for the current tick, then advance `t` by `dt`.
    pub fn next_tick(&mut self) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(self.rounds as usize * self.sessions as usize);
        for _ in 0..self.rounds {
            for session in 0..self.sessions {
                let rec = InputRecord { session, t: self.t, dt: self.dt, payload: [0; INPUT_BYTES] };
                out.push(rec.to_bytes());
            }
        }
        self.t = self.t.wrapping_add(self.dt);
        out
    }

    /// Feed `ingest` once per tick until `stop` flips. Returns records sent.
    pub async fn run(mut self, ingest: Ingest, mut stop: watch::Receiver<bool>) -> Result<u64, IngestError> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sent = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = stop.wait_for(|s| *s) => break,
                _ = ticker.tick() => {}
            }
            for rec in self.next_tick() {
                ingest.send(rec).await?;
                sent += 1;
            }
            tracing::info!(t = self.t, sent, "synthetic tick");
        }
        Ok(sent)
    }
}
