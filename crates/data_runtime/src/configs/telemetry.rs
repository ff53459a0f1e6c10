//! Telemetry configuration loaded from data/config/telemetry.toml with env overrides.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::loader::{env_parse, read_default, read_toml};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryCfg {
    pub log_level: String,
    pub json_logs: bool,
    pub metrics_addr: Option<String>, // e.g., 127.0.0.1:9000
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false, metrics_addr: None }
    }
}

impl TelemetryCfg {
    fn apply_env(mut self) -> Self {
        if let Ok(lvl) = std::env::var("LOG_LEVEL") {
            self.log_level = lvl;
        }
        if let Ok(addr) = std::env::var("METRICS_ADDR") {
            self.metrics_addr = Some(addr).filter(|a| !a.is_empty());
        }
        if let Some(json) = env_parse("JSON_LOGS") {
            self.json_logs = json;
        }
        self
    }
}

pub fn load_default() -> Result<TelemetryCfg> {
    Ok(read_default::<TelemetryCfg>("telemetry")?.apply_env())
}

pub fn load_from(path: &Path) -> Result<TelemetryCfg> {
    Ok(read_toml::<TelemetryCfg>(path)?.apply_env())
}
