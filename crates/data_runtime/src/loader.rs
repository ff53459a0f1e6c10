//! Shared plumbing for the TOML config loaders.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub(crate) fn data_root() -> PathBuf {
    // Prefer top-level workspace `data/` so tests and tools can run from any crate.
    let here = Path::new(env!("CARGO_MANIFEST_DIR"));
    let ws = here.join("../../data");
    if ws.is_dir() { ws } else { here.join("data") }
}

/// Path of `data/config/<name>.toml`.
pub fn config_path(name: &str) -> PathBuf {
    data_root().join("config").join(format!("{name}.toml"))
}

/// Parse one TOML file; missing fields take their defaults.
pub fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let txt = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str::<T>(&txt).with_context(|| format!("parse {}", path.display()))
}

/// Load `data/config/<name>.toml` when present, else `T::default()`.
pub(crate) fn read_default<T: DeserializeOwned + Default>(name: &str) -> Result<T> {
    let path = config_path(name);
    if path.is_file() { read_toml(&path) } else { Ok(T::default()) }
}

/// Env var parsed as `T`; unset or unparsable values are ignored.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
