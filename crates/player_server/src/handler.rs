//! Player server TCP port: answers Ping.

use std::net::SocketAddr;

use net_core::frame::{read_packet, write_packet};
use net_core::zone_db::PlayerServerMessage;
use net_core::WireError;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

pub async fn handle_connection<S>(mut stream: S, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Ok(Some(payload)) = read_packet(&mut stream).await {
        match PlayerServerMessage::from_payload(&payload) {
            Ok(PlayerServerMessage::Ping) => {
                if write_packet(&mut stream, &PlayerServerMessage::Pong.to_payload()).await.is_err() {
                    break;
                }
            }
            Ok(PlayerServerMessage::Pong) => {}
            Err(WireError::UnknownTag(t)) => debug!(%peer, tag = t, "ignoring unknown message"),
            Err(e) => {
                debug!(%peer, error = %e, "bad message, closing");
                break;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use net_core::frame::write_close;

    #[tokio::test]
    async fn ping_gets_pong_and_unknown_tags_are_skipped() {
        let (mut client, server) = tokio::io::duplex(1024);
        let peer = SocketAddr::from(([127, 0, 0, 1], 1));
        let task = tokio::spawn(handle_connection(server, peer));

        write_packet(&mut client, &[0x7f]).await.unwrap();
        write_packet(&mut client, &PlayerServerMessage::Ping.to_payload()).await.unwrap();
        let reply = read_packet(&mut client).await.unwrap().unwrap();
        assert_eq!(PlayerServerMessage::from_payload(&reply).unwrap(), PlayerServerMessage::Pong);

        write_close(&mut client).await.unwrap();
        task.await.unwrap();
    }
}
