//! Registry client: one TCP connection, strictly request then response.

use std::net::SocketAddr;

use net_core::frame::{read_packet, write_close, write_packet};
use net_core::index::{tag, IndexMessage, ServerData};
use net_core::WireError;
use tokio::net::TcpStream;
use world_core::World;

use crate::ClientError;

pub struct IndexClient {
    stream: TcpStream,
}

impl IndexClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);
        Ok(Self { stream })
    }

    /// Address the registry sees this client as.
    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.stream.local_addr()?)
    }

    async fn request(
        &mut self,
        msg: IndexMessage,
        expected: u8,
        name: &'static str,
    ) -> Result<IndexMessage, ClientError> {
        write_packet(&mut self.stream, &msg.to_payload()?).await?;
        loop {
            let Some(payload) = read_packet(&mut self.stream).await? else {
                return Err(ClientError::NoResponse { request: name });
            };
            let reply = match IndexMessage::from_payload(&payload) {
                Ok(m) => m,
                Err(WireError::UnknownTag(t)) => {
                    tracing::debug!(tag = t, "skipping unknown registry message");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if let IndexMessage::RequestFailed { request, reason } = reply {
                return Err(ClientError::Refused { request, reason });
            }
            if reply.tag() != expected {
                return Err(WireError::UnexpectedResponse { expected, got: reply.tag() }.into());
            }
            return Ok(reply);
        }
    }

    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.request(IndexMessage::Ping, tag::PONG, "ping").await.map(|_| ())
    }

    /// Register as a player server; returns the assigned id.
    pub async fn connect_player_server(&mut self) -> Result<u32, ClientError> {
        match self
            .request(IndexMessage::PlayerServerConnect, tag::PLAYER_SERVER_CONNECT_RESPONSE, "connect")
            .await?
        {
            IndexMessage::PlayerServerConnectResponse { id } => Ok(id),
            other => Err(unexpected(tag::PLAYER_SERVER_CONNECT_RESPONSE, &other)),
        }
    }

    pub async fn update_player_servers(&mut self) -> Result<Vec<ServerData>, ClientError> {
        match self
            .request(IndexMessage::PlayerServerUpdate, tag::PLAYER_SERVER_UPDATE_RESPONSE, "update")
            .await?
        {
            IndexMessage::PlayerServerUpdateResponse { servers } => Ok(servers),
            other => Err(unexpected(tag::PLAYER_SERVER_UPDATE_RESPONSE, &other)),
        }
    }

    pub async fn disconnect_player_server(&mut self) -> Result<(), ClientError> {
        self.request(
            IndexMessage::PlayerServerDisconnect,
            tag::PLAYER_SERVER_DISCONNECT_RESPONSE,
            "disconnect",
        )
        .await
        .map(|_| ())
    }

    pub async fn request_world(&mut self) -> Result<World, ClientError> {
        match self.request(IndexMessage::WorldRequest, tag::WORLD_RESPONSE, "world").await? {
            IndexMessage::WorldResponse { world } => Ok(World::from_bytes(&world)?),
            other => Err(unexpected(tag::WORLD_RESPONSE, &other)),
        }
    }

    /// Lease `zone_id`, or any free zone when 0. Returns the leased id.
    pub async fn lease_zone(&mut self, zone_id: u32) -> Result<u32, ClientError> {
        match self
            .request(
                IndexMessage::ZoneDatabaseConnect { zone_id },
                tag::ZONE_DATABASE_CONNECT_RESPONSE,
                "zone lease",
            )
            .await?
        {
            IndexMessage::ZoneDatabaseConnectResponse { zone_id } => Ok(zone_id),
            other => Err(unexpected(tag::ZONE_DATABASE_CONNECT_RESPONSE, &other)),
        }
    }

    pub async fn release_zone(&mut self) -> Result<(), ClientError> {
        self.request(
            IndexMessage::ZoneDatabaseDisconnect,
            tag::ZONE_DATABASE_DISCONNECT_RESPONSE,
            "zone release",
        )
        .await
        .map(|_| ())
    }

    /// Send the close frame and drop the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        write_close(&mut self.stream).await?;
        Ok(())
    }
}

fn unexpected(expected: u8, got: &IndexMessage) -> ClientError {
    WireError::UnexpectedResponse { expected, got: got.tag() }.into()
}
