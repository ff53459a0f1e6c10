//! Length-prefixed framing used on every TCP connection.
//!
//! Format (little-endian):
//! - u32 LEN (bytes of payload, not counting these 4)
//! - [u8; LEN] payload, first byte is the message tag
//!
//! A frame with `LEN == 0` is a close signal, not an empty message.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;

pub const HEADER_BYTES: usize = 4;
pub const MAX_FRAME_LEN: usize = 1_048_576; // 1 MiB cap for safety

/// Write a framed message into `out`, appending to any existing bytes.
pub fn write_msg(out: &mut Vec<u8>, payload: &[u8]) -> Result<(), WireError> {
    let len = checked_len(payload.len())?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Read a single framed message from `inp`. Returns the payload slice on success.
///
/// `Ok(None)` means the frame was a zero-length close signal.
pub fn read_msg(inp: &[u8]) -> Result<Option<&[u8]>, WireError> {
    if inp.len() < HEADER_BYTES {
        return Err(WireError::Truncated);
    }
    let mut lenb = [0u8; 4];
    lenb.copy_from_slice(&inp[..HEADER_BYTES]);
    let len = u32::from_le_bytes(lenb) as usize;
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }
    if inp.len() < HEADER_BYTES + len {
        return Err(WireError::Truncated);
    }
    Ok(Some(&inp[HEADER_BYTES..HEADER_BYTES + len]))
}

/// Read one packet from a stream.
///
/// Returns `Ok(None)` on clean end-of-stream (including a stream that ends
/// mid-frame) and on the zero-length close frame. Callers treat both `None`
/// and `Err` as "peer gone".
pub async fn read_packet<R>(r: &mut R) -> Result<Option<Vec<u8>>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut lenb = [0u8; 4];
    match r.read_exact(&mut lenb).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(lenb) as usize;
    if len == 0 {
        return Ok(None);
    }
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }
    let mut payload = vec![0u8; len];
    match r.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write one framed packet and flush it.
pub async fn write_packet<W>(w: &mut W, payload: &[u8]) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(HEADER_BYTES + payload.len());
    write_msg(&mut buf, payload)?;
    w.write_all(&buf).await?;
    w.flush().await?;
    Ok(())
}

/// Send the zero-length close frame.
pub async fn write_close<W>(w: &mut W) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    w.write_all(&0u32.to_le_bytes()).await?;
    w.flush().await?;
    Ok(())
}

fn checked_len(len: usize) -> Result<u32, WireError> {
    if len == 0 {
        // an empty payload would be read back as a close frame
        return Err(WireError::Truncated);
    }
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge { len, max: MAX_FRAME_LEN });
    }
    u32::try_from(len).map_err(|_| WireError::FrameTooLarge { len, max: MAX_FRAME_LEN })
}
