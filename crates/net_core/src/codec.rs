//! Byte-level encode/decode primitives shared by every message family.
//!
//! Everything is little-endian. Decoders consume from a `&mut &[u8]` cursor and
//! fail with [`WireError::Truncated`] instead of reading past the end, so a
//! short buffer can never panic a receiver.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use crate::WireError;

/// Size of an encoded IPv4 socket address: 4 octets + LE port.
pub const ADDR_BYTES: usize = 6;

/// Types that can write themselves into a byte buffer.
pub trait WireEncode {
    fn encode(&self, out: &mut Vec<u8>);
}

/// Types that can reconstruct themselves from a byte cursor.
pub trait WireDecode: Sized {
    fn decode(inp: &mut &[u8]) -> Result<Self, WireError>;
}

/// Split `N` bytes off the front of `inp`.
pub fn take<const N: usize>(inp: &mut &[u8]) -> Result<[u8; N], WireError> {
    if inp.len() < N {
        return Err(WireError::Truncated);
    }
    let (a, b) = inp.split_at(N);
    *inp = b;
    let mut buf = [0u8; N];
    buf.copy_from_slice(a);
    Ok(buf)
}

/// Split `n` bytes off the front of `inp` as a borrowed slice.
pub fn take_slice<'a>(inp: &mut &'a [u8], n: usize) -> Result<&'a [u8], WireError> {
    if inp.len() < n {
        return Err(WireError::Truncated);
    }
    let (a, b) = inp.split_at(n);
    *inp = b;
    Ok(a)
}

#[inline]
pub fn read_u8(inp: &mut &[u8]) -> Result<u8, WireError> {
    Ok(take::<1>(inp)?[0])
}

#[inline]
pub fn read_u16(inp: &mut &[u8]) -> Result<u16, WireError> {
    Ok(u16::from_le_bytes(take::<2>(inp)?))
}

#[inline]
pub fn read_u32(inp: &mut &[u8]) -> Result<u32, WireError> {
    Ok(u32::from_le_bytes(take::<4>(inp)?))
}

#[inline]
pub fn read_u64(inp: &mut &[u8]) -> Result<u64, WireError> {
    Ok(u64::from_le_bytes(take::<8>(inp)?))
}

#[inline]
pub fn read_i64(inp: &mut &[u8]) -> Result<i64, WireError> {
    Ok(i64::from_le_bytes(take::<8>(inp)?))
}

/// Collection lengths travel as 8-byte counts.
pub fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_le_bytes());
}

/// Read a collection length, rejecting counts that could not possibly fit in
/// the remaining input (each element needs at least `min_elem` bytes).
pub fn read_len(inp: &mut &[u8], min_elem: usize) -> Result<usize, WireError> {
    let n = read_u64(inp)?;
    let n = usize::try_from(n).map_err(|_| WireError::Truncated)?;
    if n.saturating_mul(min_elem.max(1)) > inp.len() {
        return Err(WireError::Truncated);
    }
    Ok(n)
}

/// Write a socket address as 4 IPv4 octets followed by a LE port.
///
/// IPv6 cannot be represented; IPv4-mapped v6 addresses are unwrapped.
pub fn write_addr(out: &mut Vec<u8>, addr: SocketAddr) -> Result<(), WireError> {
    let ip = match addr {
        SocketAddr::V4(v4) => *v4.ip(),
        SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped().ok_or(WireError::NotIpv4(addr))?,
    };
    out.extend_from_slice(&ip.octets());
    out.extend_from_slice(&addr.port().to_le_bytes());
    Ok(())
}

pub fn read_addr(inp: &mut &[u8]) -> Result<SocketAddr, WireError> {
    let o = take::<4>(inp)?;
    let port = read_u16(inp)?;
    Ok(SocketAddr::V4(SocketAddrV4::new(
        Ipv4Addr::new(o[0], o[1], o[2], o[3]),
        port,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_rejects_short_input() {
        let mut inp: &[u8] = &[1, 2, 3];
        assert!(matches!(take::<4>(&mut inp), Err(WireError::Truncated)));
        // nothing consumed on failure
        assert_eq!(inp.len(), 3);
    }

    #[test]
    fn addr_is_six_bytes_with_le_port() {
        let addr: SocketAddr = "10.1.2.3:60000".parse().unwrap();
        let mut buf = Vec::new();
        write_addr(&mut buf, addr).unwrap();
        assert_eq!(buf.len(), ADDR_BYTES);
        assert_eq!(&buf[..4], &[10, 1, 2, 3]);
        assert_eq!(&buf[4..], &60000u16.to_le_bytes());
        let mut s: &[u8] = &buf;
        assert_eq!(read_addr(&mut s).unwrap(), addr);
    }

    #[test]
    fn ipv6_addr_fails_fast() {
        let addr: SocketAddr = "[2001:db8::1]:80".parse().unwrap();
        let mut buf = Vec::new();
        assert!(matches!(write_addr(&mut buf, addr), Err(WireError::NotIpv4(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn mapped_ipv6_is_unwrapped() {
        let addr: SocketAddr = "[::ffff:127.0.0.1]:9000".parse().unwrap();
        let mut buf = Vec::new();
        write_addr(&mut buf, addr).unwrap();
        assert_eq!(&buf[..4], &[127, 0, 0, 1]);
    }

    #[test]
    fn read_len_rejects_impossible_counts() {
        let mut buf = Vec::new();
        write_len(&mut buf, 1_000_000);
        buf.extend_from_slice(&[0u8; 16]);
        let mut s: &[u8] = &buf;
        assert!(read_len(&mut s, 8).is_err());
    }
}
