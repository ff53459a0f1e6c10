//! TCP accept loop: one task per accepted connection until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;

use crate::shutdown::ShutdownSignal;

/// Accept until `shutdown` fires, spawning `handler(stream, peer)` per
/// connection. On shutdown, connection tasks still running are aborted.
pub async fn serve<F, Fut>(listener: TcpListener, mut shutdown: ShutdownSignal, handler: F)
where
    F: Fn(TcpStream, SocketAddr) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr().ok();
    let mut conns = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let _ = stream.set_nodelay(true);
                    metrics::counter!("server.connections_total").increment(1);
                    tracing::debug!(%peer, "accepted connection");
                    conns.spawn(handler(stream, peer));
                }
                Err(e) => {
                    // EMFILE and friends: back off instead of spinning
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            },
            Some(done) = conns.join_next(), if !conns.is_empty() => {
                if let Err(e) = done {
                    if e.is_panic() {
                        tracing::error!(error = %e, "connection task panicked");
                    }
                }
            }
        }
    }
    tracing::info!(addr = ?local, open = conns.len(), "listener stopped");
    conns.shutdown().await;
}
