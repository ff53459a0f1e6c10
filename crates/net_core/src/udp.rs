//! Datagram family between clients and a player server's ingress front end.
//!
//! No length prefix: one datagram is one message. Input packets carry a
//! redundant window of the newest samples so a lost datagram is usually
//! covered by the next one.

use crate::codec::{read_u64, read_u8, take_slice};
use crate::WireError;

pub const INPUT_BYTES: usize = 100;
pub const INPUTS_PER_PACKET: usize = 10;
pub const PLAYER_DATA_BYTES: usize = 1024;
pub const MAX_PACKET_SIZE: usize = 1384;

pub const JOIN_REQUEST_BYTES: usize = 1 + 8 + 8 + PLAYER_DATA_BYTES;
pub const JOIN_RESPONSE_BYTES: usize = 1 + 8 + 8 + 8;
pub const SAMPLE_BYTES: usize = 8 + INPUT_BYTES;

pub mod tag {
    pub const JOIN_REQUEST: u8 = 1;
    pub const JOIN_RESPONSE: u8 = 2;
    pub const INPUT: u8 = 3;
}

/// One input sample as carried on the wire (sequence and time are implied
/// by its position in the window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireSample {
    pub dt: u64,
    pub input: [u8; INPUT_BYTES],
}

/// A fully-resolved input sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSample {
    pub sequence: u64,
    pub t: u64,
    pub dt: u64,
    pub input: [u8; INPUT_BYTES],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPacket {
    pub session: u64,
    /// Sequence of the newest sample (`samples[0]`).
    pub sequence: u64,
    /// Simulation time of the newest sample.
    pub t: u64,
    /// Newest first.
    pub samples: Vec<WireSample>,
}

impl InputPacket {
    /// Resolve the window into samples, oldest first.
    ///
    /// Sample `i` has sequence `sequence - i`; its time is the next newer
    /// sample's time minus its own `dt`.
    pub fn expand(&self) -> Vec<InputSample> {
        let mut out = Vec::with_capacity(self.samples.len());
        let mut t = self.t;
        for (i, s) in self.samples.iter().enumerate() {
            if i > 0 {
                t = t.wrapping_sub(s.dt);
            }
            out.push(InputSample {
                sequence: self.sequence.wrapping_sub(i as u64),
                t,
                dt: s.dt,
                input: s.input,
            });
        }
        out.reverse();
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UdpPacket {
    JoinRequest { session: u64, sent_time: u64, player_data: Vec<u8> },
    JoinResponse { session: u64, sent_time: u64, server_time: u64 },
    Input(InputPacket),
}

impl UdpPacket {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        match self {
            UdpPacket::JoinRequest { session, sent_time, player_data } => {
                if player_data.len() > PLAYER_DATA_BYTES {
                    return Err(WireError::FrameTooLarge {
                        len: player_data.len(),
                        max: PLAYER_DATA_BYTES,
                    });
                }
                let mut out = Vec::with_capacity(JOIN_REQUEST_BYTES);
                out.push(tag::JOIN_REQUEST);
                out.extend_from_slice(&session.to_le_bytes());
                out.extend_from_slice(&sent_time.to_le_bytes());
                out.extend_from_slice(player_data);
                out.resize(JOIN_REQUEST_BYTES, 0);
                Ok(out)
            }
            UdpPacket::JoinResponse { session, sent_time, server_time } => {
                let mut out = Vec::with_capacity(JOIN_RESPONSE_BYTES);
                out.push(tag::JOIN_RESPONSE);
                out.extend_from_slice(&session.to_le_bytes());
                out.extend_from_slice(&sent_time.to_le_bytes());
                out.extend_from_slice(&server_time.to_le_bytes());
                Ok(out)
            }
            UdpPacket::Input(p) => {
                if p.samples.is_empty() || p.samples.len() > INPUTS_PER_PACKET {
                    return Err(WireError::FrameTooLarge {
                        len: p.samples.len(),
                        max: INPUTS_PER_PACKET,
                    });
                }
                let mut out = Vec::with_capacity(1 + 24 + p.samples.len() * SAMPLE_BYTES);
                out.push(tag::INPUT);
                out.extend_from_slice(&p.session.to_le_bytes());
                out.extend_from_slice(&p.sequence.to_le_bytes());
                out.extend_from_slice(&p.t.to_le_bytes());
                for s in &p.samples {
                    out.extend_from_slice(&s.dt.to_le_bytes());
                    out.extend_from_slice(&s.input);
                }
                Ok(out)
            }
        }
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, WireError> {
        let mut inp = datagram;
        match read_u8(&mut inp)? {
            tag::JOIN_REQUEST => {
                let session = read_u64(&mut inp)?;
                let sent_time = read_u64(&mut inp)?;
                let player_data = take_slice(&mut inp, PLAYER_DATA_BYTES)?.to_vec();
                Ok(UdpPacket::JoinRequest { session, sent_time, player_data })
            }
            tag::JOIN_RESPONSE => Ok(UdpPacket::JoinResponse {
                session: read_u64(&mut inp)?,
                sent_time: read_u64(&mut inp)?,
                server_time: read_u64(&mut inp)?,
            }),
            tag::INPUT => {
                let session = read_u64(&mut inp)?;
                let sequence = read_u64(&mut inp)?;
                let t = read_u64(&mut inp)?;
                let mut samples = Vec::new();
                while inp.len() >= SAMPLE_BYTES && samples.len() < INPUTS_PER_PACKET {
                    let dt = read_u64(&mut inp)?;
                    let mut input = [0u8; INPUT_BYTES];
                    input.copy_from_slice(take_slice(&mut inp, INPUT_BYTES)?);
                    samples.push(WireSample { dt, input });
                }
                if samples.is_empty() {
                    return Err(WireError::Truncated);
                }
                Ok(UdpPacket::Input(InputPacket { session, sequence, t, samples }))
            }
            other => Err(WireError::UnknownTag(other)),
        }
    }
}
