//! Authoritative registry tables: player servers and zone leases.
//!
//! Two table groups, each behind its own lock, so player-server traffic never
//! waits on zone leasing and vice versa. Locks are held only for the map
//! mutation; callers serialize replies after the guard is gone.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use net_core::index::{FailReason, ServerData};
use tokio::sync::Mutex;
use tokio::time::Instant;
use world_core::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LeaseError {
    #[error("no free zone left")]
    NoFreeZone,
    #[error("zone {0} is already owned")]
    AlreadyOwned(u32),
    #[error("zone {0} is not part of the world")]
    UnknownZone(u32),
    #[error("peer already leases zone {0}")]
    PeerAlreadyLeased(u32),
}

impl LeaseError {
    pub fn reason(self) -> FailReason {
        match self {
            LeaseError::NoFreeZone => FailReason::NoFreeZone,
            LeaseError::AlreadyOwned(_) => FailReason::AlreadyOwned,
            LeaseError::UnknownZone(_) => FailReason::UnknownZone,
            LeaseError::PeerAlreadyLeased(_) => FailReason::PeerAlreadyLeased,
        }
    }
}

#[derive(Default)]
struct PlayerTables {
    by_id: HashMap<u32, ServerData>,
    by_addr: HashMap<SocketAddr, u32>,
}

#[derive(Default)]
struct ZoneTables {
    by_zone: HashMap<u32, ServerData>,
    by_addr: HashMap<SocketAddr, u32>,
}

/// What one reaper pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    pub player_servers: Vec<ServerData>,
    pub leases: Vec<ServerData>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.player_servers.is_empty() && self.leases.is_empty()
    }
}

pub struct Registry {
    world: Arc<World>,
    // ascending, for "first free zone"
    zone_ids: Vec<u32>,
    players: Mutex<PlayerTables>,
    zones: Mutex<ZoneTables>,
    // peers whose connection ended, with the time it ended
    closed: std::sync::Mutex<HashMap<SocketAddr, Instant>>,
    // off when no reaper drains `closed`
    reaping: bool,
}

impl Registry {
    pub fn new(world: Arc<World>) -> Self {
        let zone_ids = world.zone_ids();
        Self {
            world,
            zone_ids,
            players: Mutex::new(PlayerTables::default()),
            zones: Mutex::new(ZoneTables::default()),
            closed: std::sync::Mutex::new(HashMap::new()),
            reaping: true,
        }
    }

    /// With reaping off, closed connections are not remembered and `reap`
    /// finds nothing.
    pub fn with_reaping(mut self, enabled: bool) -> Self {
        self.reaping = enabled;
        self
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// Allocate a random id that is nonzero and not in use, and record the
    /// peer. A peer that is already registered gets its existing id back.
    pub async fn register_player_server(&self, addr: SocketAddr) -> u32 {
        let mut t = self.players.lock().await;
        if let Some(&id) = t.by_addr.get(&addr) {
            return id;
        }
        let id = loop {
            let candidate: u32 = rand::random();
            if candidate != 0 && !t.by_id.contains_key(&candidate) {
                break candidate;
            }
        };
        t.by_id.insert(id, ServerData { id, addr });
        t.by_addr.insert(addr, id);
        metrics::gauge!("index.player_servers").set(t.by_id.len() as f64);
        id
    }

    /// Snapshot of every registered player server, or `None` when `addr`
    /// itself never registered. Order is by id.
    pub async fn player_servers_for(&self, addr: SocketAddr) -> Option<Vec<ServerData>> {
        let t = self.players.lock().await;
        if !t.by_addr.contains_key(&addr) {
            return None;
        }
        let mut all: Vec<ServerData> = t.by_id.values().copied().collect();
        drop(t);
        all.sort_unstable_by_key(|s| s.id);
        Some(all)
    }

    pub async fn deregister_player_server(&self, addr: SocketAddr) -> Option<u32> {
        let mut t = self.players.lock().await;
        let id = t.by_addr.remove(&addr)?;
        t.by_id.remove(&id);
        metrics::gauge!("index.player_servers").set(t.by_id.len() as f64);
        Some(id)
    }

    /// Lease `requested` for `addr`, or the lowest free zone when it is 0.
    pub async fn lease_zone(&self, addr: SocketAddr, requested: u32) -> Result<u32, LeaseError> {
        let mut t = self.zones.lock().await;
        if let Some(&held) = t.by_addr.get(&addr) {
            return Err(LeaseError::PeerAlreadyLeased(held));
        }
        let zone_id = if requested == 0 {
            self.zone_ids
                .iter()
                .copied()
                .find(|id| !t.by_zone.contains_key(id))
                .ok_or(LeaseError::NoFreeZone)?
        } else {
            if !self.world.contains_zone(requested) {
                return Err(LeaseError::UnknownZone(requested));
            }
            if t.by_zone.contains_key(&requested) {
                return Err(LeaseError::AlreadyOwned(requested));
            }
            requested
        };
        t.by_zone.insert(zone_id, ServerData { id: zone_id, addr });
        t.by_addr.insert(addr, zone_id);
        metrics::gauge!("index.zone_leases").set(t.by_zone.len() as f64);
        Ok(zone_id)
    }

    pub async fn release_zone(&self, addr: SocketAddr) -> Option<u32> {
        let mut t = self.zones.lock().await;
        let zone_id = t.by_addr.remove(&addr)?;
        t.by_zone.remove(&zone_id);
        metrics::gauge!("index.zone_leases").set(t.by_zone.len() as f64);
        Some(zone_id)
    }

    pub async fn zone_owner(&self, zone_id: u32) -> Option<ServerData> {
        self.zones.lock().await.by_zone.get(&zone_id).copied()
    }

    pub async fn player_server_count(&self) -> usize {
        self.players.lock().await.by_id.len()
    }

    pub async fn lease_count(&self) -> usize {
        self.zones.lock().await.by_zone.len()
    }

    pub(crate) fn mark_open(&self, addr: SocketAddr) {
        if let Ok(mut c) = self.closed.lock() {
            c.remove(&addr);
        }
    }

    pub(crate) fn mark_closed(&self, addr: SocketAddr) {
        if !self.reaping {
            return;
        }
        if let Ok(mut c) = self.closed.lock() {
            c.insert(addr, Instant::now());
        }
    }

    /// Closed peers waiting for `reap`.
    pub fn closed_peers(&self) -> usize {
        self.closed.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop registrations of peers whose connection closed at least `grace` ago.
    pub async fn reap(&self, grace: Duration) -> ReapReport {
        let now = Instant::now();
        let expired: Vec<SocketAddr> = match self.closed.lock() {
            Ok(mut c) => {
                let gone: Vec<SocketAddr> = c
                    .iter()
                    .filter(|(_, at)| now.saturating_duration_since(**at) >= grace)
                    .map(|(a, _)| *a)
                    .collect();
                for a in &gone {
                    c.remove(a);
                }
                gone
            }
            Err(_) => return ReapReport::default(),
        };
        let mut report = ReapReport::default();
        for addr in expired {
            if let Some(id) = self.deregister_player_server(addr).await {
                report.player_servers.push(ServerData { id, addr });
            }
            if let Some(zone_id) = self.release_zone(addr).await {
                report.leases.push(ServerData { id: zone_id, addr });
            }
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use world_core::{generate_grid_world, KILOMETER};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn registry(n: u32) -> Registry {
        Registry::new(Arc::new(generate_grid_world(n, 1, 1, KILOMETER)))
    }

    #[tokio::test]
    async fn first_free_zone_in_id_order() {
        let r = registry(2);
        assert_eq!(r.lease_zone(addr(1), 0).await, Ok(1));
        assert_eq!(r.lease_zone(addr(2), 0).await, Ok(2));
        assert_eq!(r.lease_zone(addr(3), 0).await, Err(LeaseError::NoFreeZone));
        assert_eq!(r.release_zone(addr(1)).await, Some(1));
        assert_eq!(r.lease_zone(addr(3), 0).await, Ok(1));
        assert_eq!(r.zone_owner(1).await.map(|s| s.addr), Some(addr(3)));
    }

    #[tokio::test]
    async fn explicit_requests() {
        let r = registry(3);
        assert_eq!(r.lease_zone(addr(1), 3).await, Ok(3));
        assert_eq!(r.lease_zone(addr(2), 3).await, Err(LeaseError::AlreadyOwned(3)));
        assert_eq!(r.lease_zone(addr(2), 9).await, Err(LeaseError::UnknownZone(9)));
        assert_eq!(r.lease_zone(addr(1), 2).await, Err(LeaseError::PeerAlreadyLeased(3)));
        assert_eq!(r.lease_zone(addr(2), 0).await, Ok(1));
        assert_eq!(r.lease_count().await, 2);
        assert_eq!(r.release_zone(addr(9)).await, None);
    }

    #[tokio::test]
    async fn player_server_lifecycle() {
        let r = registry(1);
        assert!(r.player_servers_for(addr(1)).await.is_none());
        let a = r.register_player_server(addr(1)).await;
        let b = r.register_player_server(addr(2)).await;
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(r.register_player_server(addr(1)).await, a);
        let list = r.player_servers_for(addr(2)).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(r.deregister_player_server(addr(1)).await, Some(a));
        assert_eq!(r.deregister_player_server(addr(1)).await, None);
        assert_eq!(r.player_server_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reaps_only_after_grace() {
        let r = registry(2);
        r.register_player_server(addr(1)).await;
        r.lease_zone(addr(2), 0).await.unwrap();
        r.mark_closed(addr(1));
        r.mark_closed(addr(2));
        assert!(r.reap(Duration::from_secs(5)).await.is_empty());
        tokio::time::advance(Duration::from_secs(5)).await;
        let rep = r.reap(Duration::from_secs(5)).await;
        assert_eq!(rep.player_servers.len(), 1);
        assert_eq!(rep.leases, vec![ServerData { id: 1, addr: addr(2) }]);
        assert_eq!(r.lease_count().await, 0);
        assert!(r.reap(Duration::ZERO).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reopened_peer_is_not_reaped() {
        let r = registry(1);
        r.lease_zone(addr(7), 0).await.unwrap();
        r.mark_closed(addr(7));
        r.mark_open(addr(7));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(r.reap(Duration::from_secs(1)).await.is_empty());
        assert_eq!(r.lease_count().await, 1);
    }

    #[test]
    fn closed_peers_are_not_kept_without_a_reaper() {
        let r = registry(1).with_reaping(false);
        for _ in 0..5_000 {
            r.mark_open(addr(9));
            r.mark_closed(addr(9));
        }
        for port in 0..100 {
            r.mark_closed(addr(port));
        }
        assert_eq!(r.closed_peers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reap_drains_closed_peers_without_registrations() {
        let r = registry(1);
        for port in 0..100 {
            r.mark_open(addr(port));
            r.mark_closed(addr(port));
        }
        assert_eq!(r.closed_peers(), 100);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(r.reap(Duration::from_secs(1)).await.is_empty());
        assert_eq!(r.closed_peers(), 0);
    }
}
