//! Zone store client: liveness ping and fire-and-forget player state.

use std::net::SocketAddr;

use net_core::frame::{read_packet, write_close, write_packet};
use net_core::zone_db::{tag, ZoneStoreMessage, PLAYER_STATE_BYTES};
use net_core::WireError;
use tokio::net::TcpStream;

use crate::ClientError;

pub struct ZoneStoreClient {
    stream: TcpStream,
}

impl ZoneStoreClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);
        Ok(Self { stream })
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        write_packet(&mut self.stream, &ZoneStoreMessage::Ping.to_payload()).await?;
        loop {
            let Some(payload) = read_packet(&mut self.stream).await? else {
                return Err(ClientError::NoResponse { request: "ping" });
            };
            match ZoneStoreMessage::from_payload(&payload) {
                Ok(ZoneStoreMessage::Pong) => return Ok(()),
                Ok(other) => {
                    return Err(WireError::UnexpectedResponse { expected: tag::PONG, got: other.tag() }.into())
                }
                Err(WireError::UnknownTag(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// No reply is sent for player state.
    pub async fn push_state(
        &mut self,
        session: u64,
        frame: u64,
        sim_time: u64,
        state: &[u8; PLAYER_STATE_BYTES],
    ) -> Result<(), ClientError> {
        let msg = ZoneStoreMessage::PlayerState { session, frame, sim_time, state: *state };
        write_packet(&mut self.stream, &msg.to_payload()).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        write_close(&mut self.stream).await?;
        Ok(())
    }
}
