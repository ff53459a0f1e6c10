//! UDP ingress: join handshake and redundant input packets.
//!
//! Each input packet repeats up to ten recent samples. A per-session
//! high-water sequence makes sure each sample reaches the session runtime
//! once, oldest first. Entries for sessions that stop sending are swept
//! after the session idle timeout.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use net_core::udp::{InputPacket, UdpPacket, MAX_PACKET_SIZE};
use net_core::WireError;
use server_core::ShutdownSignal;
use data_runtime::configs::session::SessionCfg;
use session_runtime::{Ingest, IngestError, InputRecord};
use tokio::net::UdpSocket;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrontendReport {
    pub joins: u64,
    pub forwarded: u64,
    pub duplicates: u64,
    pub malformed: u64,
    /// Dedupe entries dropped by the idle sweep.
    pub expired: u64,
}

#[derive(Debug, Clone, Copy)]
struct HighWater {
    next: u64,
    last_seen: Instant,
}

pub struct Frontend {
    socket: UdpSocket,
    ingest: Ingest,
    started: Instant,
    // next sequence to forward, per session
    next_sequence: HashMap<u64, HighWater>,
    idle_timeout: Duration,
    sweep_every: Duration,
    report: FrontendReport,
}

impl Frontend {
    pub async fn bind(addr: SocketAddr, ingest: Ingest) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.with_context(|| format!("bind udp {addr}"))?;
        tracing::info!(local_addr = %socket.local_addr()?, "udp frontend listening");
        Ok(Self {
            socket,
            ingest,
            started: Instant::now(),
            next_sequence: HashMap::new(),
            idle_timeout: SessionCfg::default().idle_timeout(),
            sweep_every: SessionCfg::default().sweep_interval(),
            report: FrontendReport::default(),
        })
    }

    /// Forget a session's dedupe state once it has sent nothing for `idle`,
    /// checking every `every`.
    pub fn with_idle_sweep(mut self, idle: Duration, every: Duration) -> Self {
        self.idle_timeout = idle;
        self.sweep_every = every.max(Duration::from_millis(1));
        self
    }

    /// Sessions with live dedupe state.
    pub fn tracked_sessions(&self) -> usize {
        self.next_sequence.len()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Server clock in microseconds since bind.
    fn server_time(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Serve datagrams until `stop` fires or the session runtime goes away.
    pub async fn run(mut self, mut stop: ShutdownSignal) -> FrontendReport {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let mut sweep = tokio::time::interval(self.sweep_every);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let (n, from) = tokio::select! {
                _ = stop.wait() => break,
                _ = sweep.tick() => {
                    self.sweep_idle();
                    continue;
                }
                got = self.socket.recv_from(&mut buf) => match got {
                    Ok(r) => r,
                    Err(e) => {
                        debug!(error = %e, "udp recv failed");
                        continue;
                    }
                },
            };
            if let Err(e) = self.on_datagram(&buf[..n], from).await {
                warn!(error = %e, "session runtime closed, stopping udp frontend");
                break;
            }
        }
        tracing::info!(
            joins = self.report.joins,
            forwarded = self.report.forwarded,
            duplicates = self.report.duplicates,
            malformed = self.report.malformed,
            expired = self.report.expired,
            "udp frontend stopped"
        );
        self.report
    }

    async fn on_datagram(&mut self, datagram: &[u8], from: SocketAddr) -> Result<(), IngestError> {
        match UdpPacket::decode(datagram) {
            Ok(UdpPacket::JoinRequest { session, sent_time, .. }) => {
                self.report.joins += 1;
                let reply = UdpPacket::JoinResponse { session, sent_time, server_time: self.server_time() };
                match reply.encode() {
                    Ok(bytes) => {
                        if let Err(e) = self.socket.send_to(&bytes, from).await {
                            debug!(%from, error = %e, "join reply failed");
                        }
                    }
                    Err(e) => debug!(error = %e, "join reply encode failed"),
                }
                Ok(())
            }
            Ok(UdpPacket::Input(packet)) => self.forward(&packet).await,
            Ok(UdpPacket::JoinResponse { .. }) => Ok(()),
            Err(WireError::UnknownTag(t)) => {
                debug!(%from, tag = t, "ignoring unknown datagram");
                Ok(())
            }
            Err(e) => {
                self.report.malformed += 1;
                metrics::counter!("player_server.malformed_datagrams_total").increment(1);
                debug!(%from, error = %e, "malformed datagram");
                Ok(())
            }
        }
    }

    /// Drop dedupe entries idle for at least the idle timeout.
    fn sweep_idle(&mut self) -> usize {
        let now = Instant::now();
        let idle = self.idle_timeout;
        let before = self.next_sequence.len();
        self.next_sequence.retain(|_, hw| now.saturating_duration_since(hw.last_seen) < idle);
        let n = before - self.next_sequence.len();
        if n > 0 {
            self.report.expired += n as u64;
            debug!(expired = n, tracked = self.next_sequence.len(), "swept idle dedupe entries");
        }
        n
    }

    async fn forward(&mut self, packet: &InputPacket) -> Result<(), IngestError> {
        let now = Instant::now();
        let hw = self.next_sequence.entry(packet.session).or_insert(HighWater { next: 0, last_seen: now });
        hw.last_seen = now;
        let mut fresh = Vec::new();
        for s in packet.expand() {
            if s.sequence < hw.next {
                self.report.duplicates += 1;
                continue;
            }
            hw.next = s.sequence.wrapping_add(1);
            fresh.push(InputRecord { session: packet.session, t: s.t, dt: s.dt, payload: s.input });
        }
        let n = fresh.len() as u64;
        for record in fresh {
            self.ingest.send(record.to_bytes()).await?;
        }
        self.report.forwarded += n;
        metrics::counter!("player_server.inputs_forwarded_total").increment(n);
        Ok(())
    }
}
