// Root shell and re-exports for workspace crates used by bins.
pub use client_core as client;
pub use data_runtime as data;
pub use index_server as index;
pub use net_core as net;
pub use player_server as player;
pub use server_core as server;
pub use session_runtime as session;
pub use world_core as world;
pub use zone_store as store;
