use std::net::{IpAddr, Ipv6Addr};

use feint_common::{tcp_flags, PacketView, TcpView};

use crate::checksum::{fold, partial_sum};
use crate::error::{CodecError, CodecResult};
use crate::ipv4::PROTO_TCP;

const IP6_HEADER_LEN: usize = 40;
const TCP_HEADER_LEN: usize = 20;

/// Parse an IPv6 + TCP packet. Extension headers are unsupported: a
/// next-header value other than TCP fails per spec.md §4.1 and §9.
pub fn parse(bytes: &[u8]) -> CodecResult<PacketView<'_>> {
    if bytes.len() < IP6_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[0] >> 4 != 6 {
        return Err(CodecError::UnsupportedVersion);
    }

    let payload_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
    let next_header = bytes[6];
    let hop_limit = bytes[7];

    if next_header != PROTO_TCP {
        return Err(CodecError::UnsupportedExtensionHeader);
    }

    let total_len = IP6_HEADER_LEN + payload_len;
    if bytes.len() < total_len {
        return Err(CodecError::Truncated);
    }
    if payload_len < TCP_HEADER_LEN {
        return Err(CodecError::InvalidTotalLength);
    }

    let mut src_octets = [0u8; 16];
    src_octets.copy_from_slice(&bytes[8..24]);
    let mut dst_octets = [0u8; 16];
    dst_octets.copy_from_slice(&bytes[24..40]);
    let src = Ipv6Addr::from(src_octets);
    let dst = Ipv6Addr::from(dst_octets);

    let tcp = &bytes[IP6_HEADER_LEN..total_len];
    let data_offset = (tcp[12] >> 4) as usize * 4;
    if data_offset < TCP_HEADER_LEN || data_offset > payload_len {
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
        src: IpAddr::V6(src),
        dst: IpAddr::V6(dst),
        ttl: hop_limit,
        tcp: tcp_view,
        tcp_payload_len: payload_len - data_offset,
    })
}

/// Build an IPv6 + TCP segment with no TCP options.
#[allow(clippy::too_many_arguments)]
pub fn build(
    buf: &mut [u8],
    src: Ipv6Addr,
    dst: Ipv6Addr,
    hop_limit: u8,
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    psh: bool,
    payload: &[u8],
) -> CodecResult<usize> {
    let tcp_len = TCP_HEADER_LEN + payload.len();
    let pkt_len = IP6_HEADER_LEN + tcp_len;
    if buf.len() < pkt_len {
        return Err(CodecError::BufferTooSmall);
    }

    buf[0..4].copy_from_slice(&0x6000_0000u32.to_be_bytes());
    buf[4..6].copy_from_slice(&(tcp_len as u16).to_be_bytes());
    buf[6] = PROTO_TCP;
    buf[7] = hop_limit;
    buf[8..24].copy_from_slice(&src.octets());
    buf[24..40].copy_from_slice(&dst.octets());

    let tcp_start = IP6_HEADER_LEN;
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

/// TCP checksum over the IPv6 pseudo-header + TCP header + payload.
#[must_use]
pub fn tcp_checksum(src: Ipv6Addr, dst: Ipv6Addr, tcp_segment: &[u8]) -> u16 {
    let mut sum = partial_sum(&src.octets());
    sum += partial_sum(&dst.octets());
    sum += partial_sum(&(tcp_segment.len() as u32).to_be_bytes());
    sum += PROTO_TCP as u32;
    sum += partial_sum(tcp_segment);
    fold(sum)
}
