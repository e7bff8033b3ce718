//! feint-codec - IPv4/IPv6 + TCP parsing, synthesis, and checksums
//!
//! `parse` dispatches on the IP version nibble to the matching parser;
//! `build_v4`/`build_v6` synthesize a forged segment with no options
//! (fixed data-offset = 5, per spec.md §4.1). `strip_tfo_cookie`
//! implements the SYN-path Fast Open cookie removal.

pub mod checksum;
pub mod error;
pub mod ipv4;
pub mod ipv6;
pub mod tfo;

pub use error::{CodecError, CodecResult};
pub use tfo::strip_tfo_cookie;

use std::net::IpAddr;

use feint_common::PacketView;

/// Parse an IPv4 or IPv6 + TCP packet, dispatching on the version nibble.
pub fn parse(bytes: &[u8]) -> CodecResult<PacketView<'_>> {
    if bytes.is_empty() {
        return Err(CodecError::Truncated);
    }
    match bytes[0] >> 4 {
        4 => ipv4::parse(bytes),
        6 => ipv6::parse(bytes),
        _ => Err(CodecError::UnsupportedVersion),
    }
}

/// Build a forged TCP segment toward `dst`, dispatching on address
/// family. `src`/`dst` must be the same family.
#[allow(clippy::too_many_arguments)]
pub fn build(
    buf: &mut [u8],
    src: IpAddr,
    dst: IpAddr,
    ttl: u8,
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    psh: bool,
    payload: &[u8],
) -> CodecResult<usize> {
    match (src, dst) {
        (IpAddr::V4(s), IpAddr::V4(d)) => {
            ipv4::build(buf, s, d, ttl, sport, dport, seq, ack, psh, payload)
        }
        (IpAddr::V6(s), IpAddr::V6(d)) => {
            ipv6::build(buf, s, d, ttl, sport, dport, seq, ack, psh, payload)
        }
        _ => Err(CodecError::AddressFamilyMismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn dispatches_to_ipv4() {
        let mut buf = [0u8; 128];
        let src = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));
        let dst = IpAddr::V4(Ipv4Addr::new(5, 6, 7, 8));
        let len = build(&mut buf, src, dst, 10, 1, 2, 0, 0, false, &[]).unwrap();
        let view = parse(&buf[..len]).unwrap();
        assert_eq!(view.src, src);
    }

    #[test]
    fn rejects_mixed_family() {
        let mut buf = [0u8; 128];
        let src = IpAddr::V4(Ipv4Addr::new(1, 2, 3, 4));
        let dst: IpAddr = "::1".parse().unwrap();
        assert_eq!(
            build(&mut buf, src, dst, 10, 1, 2, 0, 0, false, &[]).unwrap_err(),
            CodecError::AddressFamilyMismatch
        );
    }
}
