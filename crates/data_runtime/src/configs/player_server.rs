//! Player-facing server configuration (data/config/player_server.toml).

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::loader::{env_parse, read_default, read_toml};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerServerCfg {
    pub bind_addr: SocketAddr,
    pub udp_addr: SocketAddr,
    pub index_addr: SocketAddr,
    pub refresh_interval_ms: u64,
    /// Cell edge of the zone lookup grid, meters.
    pub lookup_cell_m: i64,
}

impl Default for PlayerServerCfg {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 20_000)),
            udp_addr: SocketAddr::from(([127, 0, 0, 1], 40_000)),
            index_addr: SocketAddr::from(([127, 0, 0, 1], 60_000)),
            refresh_interval_ms: 1_000,
            lookup_cell_m: 1_000,
        }
    }
}

impl PlayerServerCfg {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }

    fn apply_env(mut self) -> Self {
        if let Some(a) = env_parse("PLAYER_SERVER_BIND_ADDR") {
            self.bind_addr = a;
        }
        if let Some(a) = env_parse("PLAYER_SERVER_UDP_ADDR") {
            self.udp_addr = a;
        }
        if let Some(a) = env_parse("INDEX_ADDR") {
            self.index_addr = a;
        }
        self
    }
}

pub fn load_default() -> Result<PlayerServerCfg> {
    Ok(read_default::<PlayerServerCfg>("player_server")?.apply_env())
}

pub fn load_from(path: &Path) -> Result<PlayerServerCfg> {
    Ok(read_toml::<PlayerServerCfg>(path)?.apply_env())
}
