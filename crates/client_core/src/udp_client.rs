//! UDP client: join handshake, then a stream of redundant input packets.

use std::net::SocketAddr;
use std::time::Duration;

use net_core::udp::{InputSample, UdpPacket, INPUT_BYTES, MAX_PACKET_SIZE};
use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::input_window::{write_input_packet, InputHistory};
use crate::ClientError;

pub const JOIN_RETRY: Duration = Duration::from_millis(10);

/// What the server answered to our join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAck {
    pub server_time: u64,
    /// Round trip of the request that was answered.
    pub rtt: Duration,
}

pub struct UdpInputClient {
    socket: UdpSocket,
    session: u64,
    started: Instant,
    history: InputHistory,
    next_sequence: u64,
    t: u64,
}

impl UdpInputClient {
    pub async fn connect(server: SocketAddr, session: u64) -> Result<Self, ClientError> {
        let bind: SocketAddr = if server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(server).await?;
        Ok(Self {
            socket,
            session,
            started: Instant::now(),
            history: InputHistory::new(),
            next_sequence: 0,
            t: 0,
        })
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    fn clock_us(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Send join requests every `JOIN_RETRY` until the matching response
    /// arrives. Never gives up; wrap in a timeout to bound it.
    pub async fn join(&mut self, player_data: &[u8]) -> Result<JoinAck, ClientError> {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        loop {
            let sent_time = self.clock_us();
            let req = UdpPacket::JoinRequest {
                session: self.session,
                sent_time,
                player_data: player_data.to_vec(),
            };
            self.socket.send(&req.encode()?).await?;
            let deadline = Instant::now() + JOIN_RETRY;
            while let Ok(got) = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf)).await {
                let n = match got {
                    Ok(n) => n,
                    // ICMP unreachable surfaces here; keep retrying
                    Err(e) => {
                        tracing::debug!(error = %e, "join recv failed");
                        continue;
                    }
                };
                if let Ok(UdpPacket::JoinResponse { session, sent_time: echoed, server_time }) =
                    UdpPacket::decode(&buf[..n])
                {
                    if session == self.session {
                        let rtt = Duration::from_micros(self.clock_us().saturating_sub(echoed));
                        tracing::info!(session, server_time, rtt_us = rtt.as_micros() as u64, "joined");
                        return Ok(JoinAck { server_time, rtt });
                    }
                }
            }
        }
    }

    /// Record one input step and send the packet covering it.
    /// Returns the sample's sequence.
    pub async fn send_input(&mut self, dt: u64, input: [u8; INPUT_BYTES]) -> Result<u64, ClientError> {
        let sequence = self.next_sequence;
        self.history.record(InputSample { sequence, t: self.t, dt, input });
        self.next_sequence += 1;
        self.t = self.t.wrapping_add(dt);
        if let Some(pkt) = write_input_packet(&self.history, self.session, sequence) {
            self.socket.send(&UdpPacket::Input(pkt).encode()?).await?;
        }
        Ok(sequence)
    }
}
