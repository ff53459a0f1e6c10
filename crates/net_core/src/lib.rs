//! `net_core`: framing and message catalogs shared by every process.
//!
//! Scope
//! - `frame`: u32 length-prefixed TCP framing (slice and async stream codecs)
//! - `codec`: little-endian primitives, IPv4 address codec, encode/decode traits
//! - `index`, `zone_db`: per-family message enums for the TCP services
//! - `udp`: client join/input datagrams
//!
//! Unknown message tags surface as [`WireError::UnknownTag`] so receivers can
//! skip them and keep reading.
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use std::net::SocketAddr;

pub mod codec;
pub mod frame;
pub mod index;
pub mod udp;
pub mod zone_db;

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("short read")]
    Truncated,
    #[error("unknown message tag {0}")]
    UnknownTag(u8),
    #[error("frame too large: {len} > {max}")]
    FrameTooLarge { len: usize, max: usize },
    #[error("invalid payload: {0}")]
    Invalid(String),
    #[error("address {0} is not IPv4")]
    NotIpv4(SocketAddr),
    #[error("unexpected response: expected tag {expected}, got {got}")]
    UnexpectedResponse { expected: u8, got: u8 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// True when the peer is gone or the stream is unusable.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, WireError::Io(_) | WireError::FrameTooLarge { .. })
    }
}
