use std::net::{IpAddr, Ipv4Addr};

use feint_common::{tcp_flags, PacketView, TcpView};
use rand::Rng;

use crate::checksum::{fold, partial_sum};
use crate::error::{CodecError, CodecResult};

pub const PROTO_TCP: u8 = 6;
const IP_HEADER_LEN: usize = 20;
const TCP_HEADER_LEN: usize = 20;

/// Parse an IPv4 + TCP packet per spec.md §4.1's IPv4 parse rules.
pub fn parse(bytes: &[u8]) -> CodecResult<PacketView<'_>> {
    if bytes.len() < IP_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[0] >> 4 != 4 {
        return Err(CodecError::UnsupportedVersion);
    }
    let ihl = (bytes[0] & 0x0f) as usize * 4;
    if ihl < IP_HEADER_LEN {
        return Err(CodecError::InvalidIhl);
    }
    if bytes.len() < ihl {
        return Err(CodecError::Truncated);
    }

    let total_len = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    if total_len < ihl + TCP_HEADER_LEN {
        return Err(CodecError::InvalidTotalLength);
    }
    if bytes.len() < total_len {
        return Err(CodecError::Truncated);
    }

    let protocol = bytes[9];
    if protocol != PROTO_TCP {
        return Err(CodecError::NotTcp);
    }

    let ttl = bytes[8];
    let src = Ipv4Addr::new(bytes[12], bytes[13], bytes[14], bytes[15]);
    let dst = Ipv4Addr::new(bytes[16], bytes[17], bytes[18], bytes[19]);

    let tcp = &bytes[ihl..total_len];
    let data_offset = (tcp[12] >> 4) as usize * 4;
    if data_offset < TCP_HEADER_LEN || ihl + data_offset > total_len {
        return Err(CodecError::InvalidDataOffset);
    }

    let tcp_view = TcpView {
        src_port: u16::from_be_bytes([tcp[0], tcp[1]]),
        dst_port: u16::from_be_bytes([tcp[2], tcp[3]]),
        seq: u32::from_be_bytes([tcp[4], tcp[5], tcp[6], tcp[7]]),
        ack: u32::from_be_bytes([tcp[8], tcp[9], tcp[10], tcp[11]]),
        flags: tcp[13],
        data_offset: tcp[12] >> 4,
        window: u16::from_be_bytes([tcp[14], tcp[15]]),
        options: &tcp[TCP_HEADER_LEN..data_offset],
    };

    Ok(PacketView {
        src: IpAddr::V4(src),
        dst: IpAddr::V4(dst),
        ttl,
        tcp: tcp_view,
        tcp_payload_len: total_len - ihl - data_offset,
    })
}

/// Build an IPv4 + TCP segment with no TCP options (data-offset = 5),
/// per spec.md §4.1's IPv4/TCP build rules.
#[allow(clippy::too_many_arguments)]
pub fn build(
    buf: &mut [u8],
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ttl: u8,
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    psh: bool,
    payload: &[u8],
) -> CodecResult<usize> {
    let pkt_len = IP_HEADER_LEN + TCP_HEADER_LEN + payload.len();
    if buf.len() < pkt_len {
        return Err(CodecError::BufferTooSmall);
    }

    let id: u16 = rand::thread_rng().gen();

    buf[0] = 0x45;
    buf[1] = 0x00;
    buf[2..4].copy_from_slice(&(pkt_len as u16).to_be_bytes());
    buf[4..6].copy_from_slice(&id.to_be_bytes());
    buf[6..8].copy_from_slice(&(1u16 << 14).to_be_bytes()); // DF
    buf[8] = ttl;
    buf[9] = PROTO_TCP;
    buf[10..12].copy_from_slice(&[0, 0]);
    buf[12..16].copy_from_slice(&src.octets());
    buf[16..20].copy_from_slice(&dst.octets());

    let ip_sum = fold(partial_sum(&buf[0..IP_HEADER_LEN]));
    buf[10..12].copy_from_slice(&ip_sum.to_be_bytes());

    let tcp_start = IP_HEADER_LEN;
    let flags = tcp_flags::ACK | if psh { tcp_flags::PSH } else { 0 };
    buf[tcp_start..tcp_start + 2].copy_from_slice(&sport.to_be_bytes());
    buf[tcp_start + 2..tcp_start + 4].copy_from_slice(&dport.to_be_bytes());
    buf[tcp_start + 4..tcp_start + 8].copy_from_slice(&seq.to_be_bytes());
    buf[tcp_start + 8..tcp_start + 12].copy_from_slice(&ack.to_be_bytes());
    buf[tcp_start + 12] = 5 << 4;
    buf[tcp_start + 13] = flags;
    buf[tcp_start + 14..tcp_start + 16].copy_from_slice(&0x0080u16.to_be_bytes());
    buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&[0, 0]);
    buf[tcp_start + 18..tcp_start + 20].copy_from_slice(&[0, 0]);

    if !payload.is_empty() {
        buf[tcp_start + TCP_HEADER_LEN..pkt_len].copy_from_slice(payload);
    }

    let tcp_sum = tcp_checksum(src, dst, &buf[tcp_start..pkt_len]);
    buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&tcp_sum.to_be_bytes());

    Ok(pkt_len)
}

/// TCP checksum over the IPv4 pseudo-header + TCP header + payload.
#[must_use]
pub fn tcp_checksum(src: Ipv4Addr, dst: Ipv4Addr, tcp_segment: &[u8]) -> u16 {
    let mut sum = partial_sum(&src.octets());
    sum += partial_sum(&dst.octets());
    sum += PROTO_TCP as u32;
    sum += tcp_segment.len() as u32;
    sum += partial_sum(tcp_segment);
    fold(sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_parse_round_trips() {
        let mut buf = [0u8; 1500];
        let src = Ipv4Addr::new(203, 0, 113, 10);
        let dst = Ipv4Addr::new(192, 0, 2, 5);
        let payload = b"GET / HTTP/1.1\r\n\r\n";
        let len = build(
            &mut buf, src, dst, 3, 443, 54321, 0x2000_0001, 0x1000_0001, true, payload,
        )
        .unwrap();

        let view = parse(&buf[..len]).unwrap();
        assert_eq!(view.src, IpAddr::V4(src));
        assert_eq!(view.dst, IpAddr::V4(dst));
        assert_eq!(view.ttl, 3);
        assert_eq!(view.tcp.src_port, 443);
        assert_eq!(view.tcp.dst_port, 54321);
        assert_eq!(view.tcp.seq, 0x2000_0001);
        assert_eq!(view.tcp.ack, 0x1000_0001);
        assert!(view.tcp.has(tcp_flags::PSH));
        assert!(view.tcp.has(tcp_flags::ACK));
        assert_eq!(view.tcp_payload_len, payload.len());
    }

    #[test]
    fn ip_header_checksum_is_zero_over_itself() {
        let mut buf = [0u8; 1500];
        let len = build(
            &mut buf,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            64,
            1,
            2,
            0,
            0,
            false,
            &[],
        )
        .unwrap();
        assert_eq!(fold(partial_sum(&buf[0..IP_HEADER_LEN])), 0);
        let _ = len;
    }

    #[test]
    fn tcp_checksum_is_zero_when_verified() {
        let mut buf = [0u8; 1500];
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let len = build(&mut buf, src, dst, 64, 1, 2, 10, 20, false, b"hi").unwrap();
        let view = parse(&buf[..len]).unwrap();
        let tcp_start = 20;
        let verify = tcp_checksum(src, dst, &buf[tcp_start..len]);
        let _ = view;
        assert_eq!(verify, 0);
    }

    #[test]
    fn rejects_non_tcp_protocol() {
        let mut buf = [0u8; 40];
        buf[0] = 0x45;
        buf[2..4].copy_from_slice(&40u16.to_be_bytes());
        buf[9] = 17; // UDP
        assert_eq!(parse(&buf).unwrap_err(), CodecError::NotTcp);
    }
}
