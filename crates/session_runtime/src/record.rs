//! Fixed-size input records and the per-session state they drive.
//!
//! Record layout (little-endian): session u64, t u64, dt u64, payload [u8; 100].

pub type SessionId = u64;

pub const INPUT_BYTES: usize = 100;
pub const RECORD_BYTES: usize = 8 + 8 + 8 + INPUT_BYTES;
/// Clock (8 bytes) plus 1000 bytes of opaque state.
pub const STATE_BYTES: usize = 8 + 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is {got} bytes, expected {expected}")]
    WrongLength { got: usize, expected: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRecord {
    pub session: SessionId,
    pub t: u64,
    pub dt: u64,
    pub payload: [u8; INPUT_BYTES],
}

fn le_u64(b: &[u8]) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[..8]);
    u64::from_le_bytes(a)
}

impl InputRecord {
    pub fn parse(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != RECORD_BYTES {
            return Err(RecordError::WrongLength { got: bytes.len(), expected: RECORD_BYTES });
        }
        let mut payload = [0u8; INPUT_BYTES];
        payload.copy_from_slice(&bytes[24..]);
        Ok(Self { session: le_u64(bytes), t: le_u64(&bytes[8..]), dt: le_u64(&bytes[16..]), payload })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_BYTES);
        out.extend_from_slice(&self.session.to_le_bytes());
        out.extend_from_slice(&self.t.to_le_bytes());
        out.extend_from_slice(&self.dt.to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Session id of a raw record, without validating the rest.
pub fn peek_session(bytes: &[u8]) -> Result<SessionId, RecordError> {
    if bytes.len() < 8 {
        return Err(RecordError::WrongLength { got: bytes.len(), expected: RECORD_BYTES });
    }
    Ok(le_u64(bytes))
}

/// What a session actor's queue carries. Eviction is its own message so a
/// malformed record can never be mistaken for a stop request.
#[derive(Debug)]
pub enum Control {
    Data(InputRecord),
    Evict,
}

/// Opaque per-session state, owned by exactly one actor task.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    bytes: Box<[u8; STATE_BYTES]>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { bytes: Box::new([0u8; STATE_BYTES]) }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("clock", &self.clock())
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint()))
            .finish()
    }
}

impl SessionState {
    /// One simulation step: scramble every byte with the low byte of `t`
    /// plus its index, then store `t + dt` as the clock.
    pub fn apply(&mut self, t: u64, dt: u64) {
        let k = t as u8;
        for (i, b) in self.bytes.iter_mut().enumerate() {
            *b ^= k.wrapping_add(i as u8);
        }
        self.bytes[..8].copy_from_slice(&t.wrapping_add(dt).to_le_bytes());
    }

    pub fn clock(&self) -> u64 {
        le_u64(&self.bytes[..])
    }

    pub fn as_bytes(&self) -> &[u8; STATE_BYTES] {
        &self.bytes
    }

    /// FNV-1a over the whole buffer.
    pub fn fingerprint(&self) -> u64 {
        self.bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |h, &b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }
}
