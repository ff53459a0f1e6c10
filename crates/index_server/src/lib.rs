//! index_server: the registry every other process rendezvous with.
//!
//! Serves the world, leases zones to zone stores and tracks player servers.
//! See `registry` for the tables and `handler` for the request loop.

pub mod handler;
pub mod registry;
pub mod server;

pub use registry::{LeaseError, ReapReport, Registry};
pub use server::{grid_world, IndexServer, IndexServerHandle};
