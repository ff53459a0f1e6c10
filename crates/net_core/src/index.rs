//! Registry ("index server") message family.
//!
//! Requests and their `*Response` tags are adjacent small integers. A receiver
//! that sees a tag it does not know gets [`WireError::UnknownTag`] and is
//! expected to skip the frame, not drop the connection.

use std::net::SocketAddr;

use crate::codec::{read_addr, read_u32, read_u8, write_addr, ADDR_BYTES};
use crate::frame::HEADER_BYTES;
use crate::WireError;

pub mod tag {
    pub const PING: u8 = 0;
    pub const PONG: u8 = 1;
    pub const PLAYER_SERVER_CONNECT: u8 = 2;
    pub const PLAYER_SERVER_CONNECT_RESPONSE: u8 = 3;
    pub const PLAYER_SERVER_DISCONNECT: u8 = 4;
    pub const PLAYER_SERVER_DISCONNECT_RESPONSE: u8 = 5;
    pub const PLAYER_SERVER_UPDATE: u8 = 6;
    pub const PLAYER_SERVER_UPDATE_RESPONSE: u8 = 7;
    pub const WORLD_REQUEST: u8 = 8;
    pub const WORLD_RESPONSE: u8 = 9;
    pub const ZONE_DATABASE_CONNECT: u8 = 10;
    pub const ZONE_DATABASE_CONNECT_RESPONSE: u8 = 11;
    pub const ZONE_DATABASE_DISCONNECT: u8 = 12;
    pub const ZONE_DATABASE_DISCONNECT_RESPONSE: u8 = 13;
    pub const REQUEST_FAILED: u8 = 14;
}

/// The whole world must fit in one frame of this many bytes (header included).
pub const MAX_WORLD_PACKET_SIZE: usize = 4 * 1024;

/// A registered peer: its registry-assigned id and the address it connected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServerData {
    pub id: u32,
    pub addr: SocketAddr,
}

/// Why a registry request was refused (payload of `RequestFailed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    Unspecified,
    NoFreeZone,
    AlreadyOwned,
    UnknownZone,
    NotRegistered,
    PeerAlreadyLeased,
}

impl FailReason {
    pub fn code(self) -> u8 {
        match self {
            FailReason::Unspecified => 0,
            FailReason::NoFreeZone => 1,
            FailReason::AlreadyOwned => 2,
            FailReason::UnknownZone => 3,
            FailReason::NotRegistered => 4,
            FailReason::PeerAlreadyLeased => 5,
        }
    }

    /// Unknown codes from newer peers collapse to `Unspecified`.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => FailReason::NoFreeZone,
            2 => FailReason::AlreadyOwned,
            3 => FailReason::UnknownZone,
            4 => FailReason::NotRegistered,
            5 => FailReason::PeerAlreadyLeased,
            _ => FailReason::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexMessage {
    Ping,
    Pong,
    PlayerServerConnect,
    PlayerServerConnectResponse { id: u32 },
    PlayerServerDisconnect,
    PlayerServerDisconnectResponse,
    PlayerServerUpdate,
    PlayerServerUpdateResponse { servers: Vec<ServerData> },
    WorldRequest,
    /// Encoded `World` bytes (see `world_core`).
    WorldResponse { world: Vec<u8> },
    ZoneDatabaseConnect { zone_id: u32 },
    ZoneDatabaseConnectResponse { zone_id: u32 },
    ZoneDatabaseDisconnect,
    ZoneDatabaseDisconnectResponse,
    RequestFailed { request: u8, reason: FailReason },
}

impl IndexMessage {
    pub fn tag(&self) -> u8 {
        match self {
            IndexMessage::Ping => tag::PING,
            IndexMessage::Pong => tag::PONG,
            IndexMessage::PlayerServerConnect => tag::PLAYER_SERVER_CONNECT,
            IndexMessage::PlayerServerConnectResponse { .. } => tag::PLAYER_SERVER_CONNECT_RESPONSE,
            IndexMessage::PlayerServerDisconnect => tag::PLAYER_SERVER_DISCONNECT,
            IndexMessage::PlayerServerDisconnectResponse => tag::PLAYER_SERVER_DISCONNECT_RESPONSE,
            IndexMessage::PlayerServerUpdate => tag::PLAYER_SERVER_UPDATE,
            IndexMessage::PlayerServerUpdateResponse { .. } => tag::PLAYER_SERVER_UPDATE_RESPONSE,
            IndexMessage::WorldRequest => tag::WORLD_REQUEST,
            IndexMessage::WorldResponse { .. } => tag::WORLD_RESPONSE,
            IndexMessage::ZoneDatabaseConnect { .. } => tag::ZONE_DATABASE_CONNECT,
            IndexMessage::ZoneDatabaseConnectResponse { .. } => tag::ZONE_DATABASE_CONNECT_RESPONSE,
            IndexMessage::ZoneDatabaseDisconnect => tag::ZONE_DATABASE_DISCONNECT,
            IndexMessage::ZoneDatabaseDisconnectResponse => tag::ZONE_DATABASE_DISCONNECT_RESPONSE,
            IndexMessage::RequestFailed { .. } => tag::REQUEST_FAILED,
        }
    }

    /// Encode into a frame payload (tag byte first).
    pub fn to_payload(&self) -> Result<Vec<u8>, WireError> {
        let mut out = vec![self.tag()];
        match self {
            IndexMessage::PlayerServerConnectResponse { id } => {
                out.extend_from_slice(&id.to_le_bytes());
            }
            IndexMessage::PlayerServerUpdateResponse { servers } => {
                let n = u32::try_from(servers.len()).map_err(|_| WireError::FrameTooLarge {
                    len: servers.len(),
                    max: u32::MAX as usize,
                })?;
                out.reserve(4 + servers.len() * (4 + ADDR_BYTES));
                out.extend_from_slice(&n.to_le_bytes());
                for s in servers {
                    out.extend_from_slice(&s.id.to_le_bytes());
                    write_addr(&mut out, s.addr)?;
                }
            }
            IndexMessage::WorldResponse { world } => {
                let len = HEADER_BYTES + 1 + world.len();
                if len > MAX_WORLD_PACKET_SIZE {
                    return Err(WireError::FrameTooLarge { len, max: MAX_WORLD_PACKET_SIZE });
                }
                out.extend_from_slice(world);
            }
            IndexMessage::ZoneDatabaseConnect { zone_id }
            | IndexMessage::ZoneDatabaseConnectResponse { zone_id } => {
                out.extend_from_slice(&zone_id.to_le_bytes());
            }
            IndexMessage::RequestFailed { request, reason } => {
                out.push(*request);
                out.push(reason.code());
            }
            IndexMessage::Ping
            | IndexMessage::Pong
            | IndexMessage::PlayerServerConnect
            | IndexMessage::PlayerServerDisconnect
            | IndexMessage::PlayerServerDisconnectResponse
            | IndexMessage::PlayerServerUpdate
            | IndexMessage::WorldRequest
            | IndexMessage::ZoneDatabaseDisconnect
            | IndexMessage::ZoneDatabaseDisconnectResponse => {}
        }
        Ok(out)
    }

    /// Decode a frame payload. Trailing bytes after the required fields are ignored.
    pub fn from_payload(payload: &[u8]) -> Result<Self, WireError> {
        let mut inp = payload;
        let t = read_u8(&mut inp)?;
        let msg = match t {
            tag::PING => IndexMessage::Ping,
            tag::PONG => IndexMessage::Pong,
            tag::PLAYER_SERVER_CONNECT => IndexMessage::PlayerServerConnect,
            tag::PLAYER_SERVER_CONNECT_RESPONSE => {
                IndexMessage::PlayerServerConnectResponse { id: read_u32(&mut inp)? }
            }
            tag::PLAYER_SERVER_DISCONNECT => IndexMessage::PlayerServerDisconnect,
            tag::PLAYER_SERVER_DISCONNECT_RESPONSE => IndexMessage::PlayerServerDisconnectResponse,
            tag::PLAYER_SERVER_UPDATE => IndexMessage::PlayerServerUpdate,
            tag::PLAYER_SERVER_UPDATE_RESPONSE => {
                let n = read_u32(&mut inp)? as usize;
                if n.saturating_mul(4 + ADDR_BYTES) > inp.len() {
                    return Err(WireError::Truncated);
                }
                let mut servers = Vec::with_capacity(n);
                for _ in 0..n {
                    let id = read_u32(&mut inp)?;
                    let addr = read_addr(&mut inp)?;
                    servers.push(ServerData { id, addr });
                }
                IndexMessage::PlayerServerUpdateResponse { servers }
            }
            tag::WORLD_REQUEST => IndexMessage::WorldRequest,
            tag::WORLD_RESPONSE => IndexMessage::WorldResponse { world: inp.to_vec() },
            tag::ZONE_DATABASE_CONNECT => {
                IndexMessage::ZoneDatabaseConnect { zone_id: read_u32(&mut inp)? }
            }
            tag::ZONE_DATABASE_CONNECT_RESPONSE => {
                IndexMessage::ZoneDatabaseConnectResponse { zone_id: read_u32(&mut inp)? }
            }
            tag::ZONE_DATABASE_DISCONNECT => IndexMessage::ZoneDatabaseDisconnect,
            tag::ZONE_DATABASE_DISCONNECT_RESPONSE => IndexMessage::ZoneDatabaseDisconnectResponse,
            tag::REQUEST_FAILED => {
                let request = read_u8(&mut inp)?;
                let reason = FailReason::from_code(read_u8(&mut inp)?);
                IndexMessage::RequestFailed { request, reason }
            }
            other => return Err(WireError::UnknownTag(other)),
        };
        Ok(msg)
    }
}
