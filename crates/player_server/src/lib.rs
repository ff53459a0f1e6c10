//! player_server: registers with the registry, keeps the world and peer list,
//! and feeds client input into the session runtime.

pub mod frontend;
pub mod handler;
pub mod node;

pub use frontend::{Frontend, FrontendReport};
pub use node::PlayerServerNode;
