//! Zone store peer configuration (data/config/zone_store.toml).

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::loader::{env_parse, read_default, read_toml};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ZoneStoreCfg {
    pub bind_addr: SocketAddr,
    pub index_addr: SocketAddr,
    /// 0 leases any free zone.
    pub requested_zone: u32,
    pub history_size: usize,
    /// Seconds without a state update before a player's history is dropped;
    /// 0 keeps histories forever.
    pub idle_timeout_secs: u64,
    pub sweep_interval_ms: u64,
}

impl Default for ZoneStoreCfg {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 50_000)),
            index_addr: SocketAddr::from(([127, 0, 0, 1], 60_000)),
            requested_zone: 0,
            history_size: 1_024,
            idle_timeout_secs: 15,
            sweep_interval_ms: 1_000,
        }
    }
}

impl ZoneStoreCfg {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    fn apply_env(mut self) -> Self {
        if let Some(a) = env_parse("ZONE_STORE_BIND_ADDR") {
            self.bind_addr = a;
        }
        if let Some(a) = env_parse("INDEX_ADDR") {
            self.index_addr = a;
        }
        if let Some(z) = env_parse("ZONE_ID") {
            self.requested_zone = z;
        }
        self
    }
}

pub fn load_default() -> Result<ZoneStoreCfg> {
    Ok(read_default::<ZoneStoreCfg>("zone_store")?.apply_env())
}

pub fn load_from(path: &Path) -> Result<ZoneStoreCfg> {
    Ok(read_toml::<ZoneStoreCfg>(path)?.apply_env())
}
