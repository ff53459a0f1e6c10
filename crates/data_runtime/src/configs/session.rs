//! Session actor runtime tuning (data/config/session.toml).

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::loader::{env_parse, read_default, read_toml};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionCfg {
    /// 0 means one shard per available core.
    pub shards: usize,
    pub queue_capacity: usize,
    pub feed_capacity: usize,
    pub idle_timeout_secs: u64,
    pub sweep_interval_ms: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            shards: 0,
            queue_capacity: 100_000,
            feed_capacity: 65_536,
            idle_timeout_secs: 15,
            sweep_interval_ms: 1_000,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl SessionCfg {
    pub fn effective_shards(&self) -> usize {
        if self.shards > 0 {
            return self.shards;
        }
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    fn apply_env(mut self) -> Self {
        if let Some(n) = env_parse("SESSION_SHARDS") {
            self.shards = n;
        }
        if let Some(s) = env_parse("SESSION_IDLE_TIMEOUT_SECS") {
            self.idle_timeout_secs = s;
        }
        self
    }
}

pub fn load_default() -> Result<SessionCfg> {
    Ok(read_default::<SessionCfg>("session")?.apply_env())
}

pub fn load_from(path: &Path) -> Result<SessionCfg> {
    Ok(read_toml::<SessionCfg>(path)?.apply_env())
}
