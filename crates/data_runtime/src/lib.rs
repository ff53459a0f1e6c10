//! data_runtime: configuration schemas and loaders.
//!
//! Every config lives in `data/config/<name>.toml` at the workspace root.
//! Missing files fall back to `Default`; environment variables override
//! individual fields after the file is read.

pub mod loader;
pub mod configs {
    pub mod index_server;
    pub mod player_server;
    pub mod session;
    pub mod telemetry;
    pub mod zone_store;
}
