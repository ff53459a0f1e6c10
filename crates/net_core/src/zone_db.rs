//! Zone store message family (player-server -> zone store) and the tiny
//! player-server command family.

use crate::codec::{read_u64, read_u8, take_slice};
use crate::WireError;

/// Opaque per-player state carried in a `PlayerState` message.
pub const PLAYER_STATE_BYTES: usize = 100;

pub mod tag {
    pub const PING: u8 = 0;
    pub const PONG: u8 = 1;
    pub const PLAYER_STATE: u8 = 2;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneStoreMessage {
    Ping,
    Pong,
    PlayerState {
        session: u64,
        frame: u64,
        sim_time: u64,
        state: [u8; PLAYER_STATE_BYTES],
    },
}

impl ZoneStoreMessage {
    pub fn tag(&self) -> u8 {
        match self {
            ZoneStoreMessage::Ping => tag::PING,
            ZoneStoreMessage::Pong => tag::PONG,
            ZoneStoreMessage::PlayerState { .. } => tag::PLAYER_STATE,
        }
    }

    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            ZoneStoreMessage::Ping | ZoneStoreMessage::Pong => vec![self.tag()],
            ZoneStoreMessage::PlayerState { session, frame, sim_time, state } => {
                let mut out = Vec::with_capacity(1 + 24 + PLAYER_STATE_BYTES);
                out.push(tag::PLAYER_STATE);
                out.extend_from_slice(&session.to_le_bytes());
                out.extend_from_slice(&frame.to_le_bytes());
                out.extend_from_slice(&sim_time.to_le_bytes());
                out.extend_from_slice(state);
                out
            }
        }
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, WireError> {
        let mut inp = payload;
        match read_u8(&mut inp)? {
            tag::PING => Ok(ZoneStoreMessage::Ping),
            tag::PONG => Ok(ZoneStoreMessage::Pong),
            tag::PLAYER_STATE => {
                let session = read_u64(&mut inp)?;
                let frame = read_u64(&mut inp)?;
                let sim_time = read_u64(&mut inp)?;
                let mut state = [0u8; PLAYER_STATE_BYTES];
                state.copy_from_slice(take_slice(&mut inp, PLAYER_STATE_BYTES)?);
                Ok(ZoneStoreMessage::PlayerState { session, frame, sim_time, state })
            }
            other => Err(WireError::UnknownTag(other)),
        }
    }
}

/// Commands a player server answers on its TCP port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerServerMessage {
    Ping,
    Pong,
}

impl PlayerServerMessage {
    pub fn to_payload(self) -> Vec<u8> {
        match self {
            PlayerServerMessage::Ping => vec![tag::PING],
            PlayerServerMessage::Pong => vec![tag::PONG],
        }
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, WireError> {
        let mut inp = payload;
        match read_u8(&mut inp)? {
            tag::PING => Ok(PlayerServerMessage::Ping),
            tag::PONG => Ok(PlayerServerMessage::Pong),
            other => Err(WireError::UnknownTag(other)),
        }
    }
}
