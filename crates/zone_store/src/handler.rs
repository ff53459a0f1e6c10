//! Zone store request loop: Ping and PlayerState.

use std::net::SocketAddr;
use std::sync::Arc;

use net_core::frame::{read_packet, write_packet};
use net_core::zone_db::ZoneStoreMessage;
use net_core::WireError;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::store::ZoneStore;

pub async fn handle_connection<S>(store: Arc<ZoneStore>, mut stream: S, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let payload = match read_packet(&mut stream).await {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(e) => {
                debug!(%peer, error = %e, "read failed");
                break;
            }
        };
        match ZoneStoreMessage::from_payload(&payload) {
            Ok(ZoneStoreMessage::Ping) => {
                if write_packet(&mut stream, &ZoneStoreMessage::Pong.to_payload()).await.is_err() {
                    break;
                }
            }
            Ok(ZoneStoreMessage::PlayerState { session, frame, sim_time, state }) => {
                store.record(session, frame, sim_time, state);
                metrics::counter!("zone_store.player_states_total").increment(1);
            }
            Ok(ZoneStoreMessage::Pong) => {}
            Err(WireError::UnknownTag(t)) => debug!(%peer, tag = t, "ignoring unknown message"),
            Err(e) => {
                warn!(%peer, error = %e, "malformed zone store message, closing");
                break;
            }
        }
    }
}
