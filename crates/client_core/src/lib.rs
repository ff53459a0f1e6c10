//! Client sides of the cluster protocols.
//!
//! - `index_client`: request/response client for the registry.
//! - `zone_store_client`: pushes player state to a zone store.
//! - `input_window`: local input history and the redundant input packet.
//! - `udp_client`: join handshake and input stream over UDP.

#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod index_client;
pub mod input_window;
pub mod udp_client;
pub mod zone_store_client;

use net_core::index::FailReason;
use net_core::WireError;

pub use index_client::IndexClient;
pub use input_window::{write_input_packet, InputHistory};
pub use udp_client::UdpInputClient;
pub use zone_store_client::ZoneStoreClient;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("connection closed without a response to {request}")]
    NoResponse { request: &'static str },
    #[error("request {request} refused: {reason:?}")]
    Refused { request: u8, reason: FailReason },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for refusals and silent closes, the two ways a registry says no.
    pub fn is_refusal(&self) -> bool {
        matches!(self, ClientError::Refused { .. } | ClientError::NoResponse { .. })
    }
}
