//! Registry service configuration (data/config/index_server.toml).

use anyhow::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

use crate::loader::{env_parse, read_default, read_toml};

/// Uniform grid world the registry generates at startup.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GridCfg {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
    pub cell_size_m: i64,
}

impl Default for GridCfg {
    fn default() -> Self {
        Self { nx: 2, ny: 1, nz: 2, cell_size_m: 1_000 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexServerCfg {
    pub bind_addr: SocketAddr,
    pub grid: GridCfg,
    /// Reply `RequestFailed` instead of staying silent on a refused request.
    pub explicit_nacks: bool,
    /// Seconds a closed peer keeps its registrations; 0 disables reaping.
    pub reap_grace_secs: u64,
    pub reap_interval_ms: u64,
}

impl Default for IndexServerCfg {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 60_000)),
            grid: GridCfg::default(),
            explicit_nacks: true,
            reap_grace_secs: 15,
            reap_interval_ms: 1_000,
        }
    }
}

impl IndexServerCfg {
    fn apply_env(mut self) -> Self {
        if let Some(a) = env_parse("INDEX_BIND_ADDR") {
            self.bind_addr = a;
        }
        if let Some(v) = env_parse("INDEX_EXPLICIT_NACKS") {
            self.explicit_nacks = v;
        }
        if let Some(v) = env_parse("INDEX_REAP_GRACE_SECS") {
            self.reap_grace_secs = v;
        }
        self
    }
}

pub fn load_default() -> Result<IndexServerCfg> {
    Ok(read_default::<IndexServerCfg>("index_server")?.apply_env())
}

pub fn load_from(path: &Path) -> Result<IndexServerCfg> {
    Ok(read_toml::<IndexServerCfg>(path)?.apply_env())
}
