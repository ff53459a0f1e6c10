//! Per-session ring of recent player states, slot `frame % history_size`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use net_core::zone_db::PLAYER_STATE_BYTES;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEntry {
    pub frame: u64,
    pub sim_time: u64,
    pub state: [u8; PLAYER_STATE_BYTES],
}

struct History {
    last_update: Instant,
    last_frame: u64,
    slots: Vec<Option<StateEntry>>,
}

pub struct ZoneStore {
    history_size: usize,
    players: Mutex<HashMap<u64, History>>,
}

impl ZoneStore {
    pub fn new(history_size: usize) -> Self {
        Self { history_size: history_size.max(1), players: Mutex::new(HashMap::new()) }
    }

    pub fn history_size(&self) -> usize {
        self.history_size
    }

    fn slot(&self, frame: u64) -> usize {
        (frame % self.history_size as u64) as usize
    }

    /// Last write wins per slot; older frames are not protected.
    pub fn record(&self, session: u64, frame: u64, sim_time: u64, state: [u8; PLAYER_STATE_BYTES]) {
        let i = self.slot(frame);
        let mut players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        let h = players.entry(session).or_insert_with(|| History {
            last_update: Instant::now(),
            last_frame: frame,
            slots: vec![None; self.history_size],
        });
        h.last_update = Instant::now();
        h.last_frame = frame;
        h.slots[i] = Some(StateEntry { frame, sim_time, state });
    }

    /// The most recently written entry.
    pub fn latest(&self, session: u64) -> Option<StateEntry> {
        let players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        let h = players.get(&session)?;
        h.slots[self.slot(h.last_frame)]
    }

    /// Entry for exactly `frame`, if its slot has not been reused.
    pub fn state_at(&self, session: u64, frame: u64) -> Option<StateEntry> {
        let players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        players.get(&session)?.slots[self.slot(frame)].filter(|e| e.frame == frame)
    }

    pub fn last_update(&self, session: u64) -> Option<Instant> {
        let players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        players.get(&session).map(|h| h.last_update)
    }

    /// Drop every history not updated for at least `idle`; returns how many.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let mut players = self.players.lock().unwrap_or_else(PoisonError::into_inner);
        let before = players.len();
        players.retain(|_, h| now.saturating_duration_since(h.last_update) < idle);
        before - players.len()
    }

    pub fn session_count(&self) -> usize {
        self.players.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
