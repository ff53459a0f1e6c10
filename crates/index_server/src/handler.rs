//! Per-connection request loop for the registry protocol.

use std::net::SocketAddr;
use std::sync::Arc;

use net_core::frame::{read_packet, write_packet};
use net_core::index::{tag, FailReason, IndexMessage};
use net_core::WireError;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::registry::Registry;

/// Shared, read-only inputs of every handler.
pub struct HandlerCtx {
    pub registry: Arc<Registry>,
    /// Complete `WorldResponse` payload, encoded once at startup.
    pub world_payload: Vec<u8>,
    pub explicit_nacks: bool,
}

enum Reply {
    Send(IndexMessage),
    Raw(Vec<u8>),
    Nothing,
    Refuse { request: u8, reason: FailReason },
}

// Marks the peer closed however the handler exits (including abort).
struct ClosedOnDrop {
    registry: Arc<Registry>,
    peer: SocketAddr,
}

impl Drop for ClosedOnDrop {
    fn drop(&mut self) {
        self.registry.mark_closed(self.peer);
    }
}

pub async fn handle_connection<S>(ctx: Arc<HandlerCtx>, mut stream: S, peer: SocketAddr)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ctx.registry.mark_open(peer);
    let _closed = ClosedOnDrop { registry: ctx.registry.clone(), peer };
    debug!(%peer, "registry connection opened");
    loop {
        let payload = match read_packet(&mut stream).await {
            Ok(Some(p)) => p,
            Ok(None) => break,
            Err(e) => {
                debug!(%peer, error = %e, "read failed");
                break;
            }
        };
        let msg = match IndexMessage::from_payload(&payload) {
            Ok(m) => m,
            Err(WireError::UnknownTag(t)) => {
                debug!(%peer, tag = t, "ignoring unknown message");
                continue;
            }
            Err(e) => {
                warn!(%peer, error = %e, "malformed registry message");
                break;
            }
        };
        let out = match dispatch(&ctx, peer, msg).await {
            Reply::Send(m) => match m.to_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!(%peer, error = %e, "reply encode failed");
                    break;
                }
            },
            Reply::Raw(p) => p,
            Reply::Nothing => continue,
            Reply::Refuse { request, reason } => {
                metrics::counter!("index.refusals_total").increment(1);
                if !ctx.explicit_nacks {
                    break;
                }
                match (IndexMessage::RequestFailed { request, reason }).to_payload() {
                    Ok(p) => p,
                    Err(_) => break,
                }
            }
        };
        if let Err(e) = write_packet(&mut stream, &out).await {
            debug!(%peer, error = %e, "write failed");
            break;
        }
    }
    debug!(%peer, "registry connection closed");
}

async fn dispatch(ctx: &HandlerCtx, peer: SocketAddr, msg: IndexMessage) -> Reply {
    let reg = &ctx.registry;
    match msg {
        IndexMessage::Ping => Reply::Send(IndexMessage::Pong),
        IndexMessage::PlayerServerConnect => {
            let id = reg.register_player_server(peer).await;
            info!(%peer, id = format_args!("0x{id:08x}"), "player server connected");
            Reply::Send(IndexMessage::PlayerServerConnectResponse { id })
        }
        IndexMessage::PlayerServerUpdate => match reg.player_servers_for(peer).await {
            Some(servers) => {
                debug!(%peer, count = servers.len(), "player server update");
                Reply::Send(IndexMessage::PlayerServerUpdateResponse { servers })
            }
            None => {
                warn!(%peer, "update from unknown player server");
                Reply::Refuse { request: tag::PLAYER_SERVER_UPDATE, reason: FailReason::NotRegistered }
            }
        },
        IndexMessage::PlayerServerDisconnect => match reg.deregister_player_server(peer).await {
            Some(id) => {
                info!(%peer, id = format_args!("0x{id:08x}"), "player server disconnected");
                Reply::Send(IndexMessage::PlayerServerDisconnectResponse)
            }
            None => {
                warn!(%peer, "unknown player server disconnected");
                Reply::Refuse {
                    request: tag::PLAYER_SERVER_DISCONNECT,
                    reason: FailReason::NotRegistered,
                }
            }
        },
        IndexMessage::WorldRequest => Reply::Raw(ctx.world_payload.clone()),
        IndexMessage::ZoneDatabaseConnect { zone_id } => match reg.lease_zone(peer, zone_id).await {
            Ok(zone_id) => {
                info!(%peer, zone_id, "zone leased");
                Reply::Send(IndexMessage::ZoneDatabaseConnectResponse { zone_id })
            }
            Err(e) => {
                warn!(%peer, requested = zone_id, error = %e, "zone lease refused");
                Reply::Refuse { request: tag::ZONE_DATABASE_CONNECT, reason: e.reason() }
            }
        },
        IndexMessage::ZoneDatabaseDisconnect => match reg.release_zone(peer).await {
            Some(zone_id) => {
                info!(%peer, zone_id, "zone released");
                Reply::Send(IndexMessage::ZoneDatabaseDisconnectResponse)
            }
            None => {
                warn!(%peer, "unknown zone database disconnected");
                Reply::Refuse {
                    request: tag::ZONE_DATABASE_DISCONNECT,
                    reason: FailReason::NotRegistered,
                }
            }
        },
        // responses and NACKs are client-bound; a peer echoing them is ignored
        other => {
            debug!(%peer, tag = other.tag(), "ignoring client-bound message");
            Reply::Nothing
        }
    }
}
