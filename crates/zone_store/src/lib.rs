//! zone_store: owns one leased zone and keeps a short state history per
//! player session pushed to it by player servers.

pub mod handler;
pub mod node;
pub mod store;

pub use node::ZoneStoreNode;
pub use store::{StateEntry, ZoneStore};
