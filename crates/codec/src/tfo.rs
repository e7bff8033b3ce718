//! TCP Fast Open cookie stripping (spec.md §4.1).
//!
//! Operates in place on a full IPv4 or IPv6 packet buffer: walks the
//! TCP option list, overwrites any kind-34 (Fast Open Cookie) option
//! with NOPs, and recomputes the TCP checksum if anything changed.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::{CodecError, CodecResult};
use crate::{ipv4, ipv6};

const OPT_END: u8 = 0;
const OPT_NOP: u8 = 1;
const OPT_FASTOPEN: u8 = 34;

/// Zero-copy walk over a TCP option region that overwrites any kind-34
/// TLV with NOPs. Returns whether anything was modified. Bounds-checked
/// per spec.md §4.1: a malformed option (`len < 2` or running past the
/// end) stops the walk rather than panicking.
fn strip_options(options: &mut [u8]) -> bool {
    let mut modified = false;
    let mut i = 0;
    while i < options.len() {
        match options[i] {
            OPT_END => break,
            OPT_NOP => i += 1,
            kind => {
                if i + 1 >= options.len() {
                    break;
                }
                let len = options[i + 1] as usize;
                if len < 2 || i + len > options.len() {
                    break;
                }
                if kind == OPT_FASTOPEN {
                    options[i..i + len].fill(OPT_NOP);
                    modified = true;
                }
                i += len;
            }
        }
    }
    modified
}

/// Strip any TFO cookie options from a SYN packet, dispatching on the
/// IP version nibble. Returns whether the packet was modified so the
/// caller can mark it for resubmission with mutated bytes.
pub fn strip_tfo_cookie(buf: &mut [u8]) -> CodecResult<bool> {
    if buf.is_empty() {
        return Err(CodecError::Truncated);
    }
    match buf[0] >> 4 {
        4 => strip_tfo_ipv4(buf),
        6 => strip_tfo_ipv6(buf),
        _ => Err(CodecError::UnsupportedVersion),
    }
}

fn strip_tfo_ipv4(buf: &mut [u8]) -> CodecResult<bool> {
    if buf.len() < 20 {
        return Err(CodecError::Truncated);
    }
    let ihl = (buf[0] & 0x0f) as usize * 4;
    let total_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
    if buf.len() < total_len || total_len < ihl + 20 {
        return Err(CodecError::Truncated);
    }

    let tcp_start = ihl;
    let data_offset = (buf[tcp_start + 12] >> 4) as usize * 4;
    if data_offset < 20 || tcp_start + data_offset > total_len {
        return Err(CodecError::InvalidDataOffset);
    }

    let opts_start = tcp_start + 20;
    let opts_end = tcp_start + data_offset;
    let modified = strip_options(&mut buf[opts_start..opts_end]);

    if modified {
        let src = Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]);
        let dst = Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]);
        buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&[0, 0]);
        let sum = ipv4::tcp_checksum(src, dst, &buf[tcp_start..total_len]);
        buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&sum.to_be_bytes());
    }

    Ok(modified)
}

fn strip_tfo_ipv6(buf: &mut [u8]) -> CodecResult<bool> {
    if buf.len() < 40 {
        return Err(CodecError::Truncated);
    }
    if buf[6] != ipv4::PROTO_TCP {
        return Err(CodecError::UnsupportedExtensionHeader);
    }
    let payload_len = u16::from_be_bytes([buf[4], buf[5]]) as usize;
    let total_len = 40 + payload_len;
    if buf.len() < total_len || payload_len < 20 {
        return Err(CodecError::Truncated);
    }

    let tcp_start = 40;
    let data_offset = (buf[tcp_start + 12] >> 4) as usize * 4;
    if data_offset < 20 || data_offset > payload_len {
        return Err(CodecError::InvalidDataOffset);
    }

    let opts_start = tcp_start + 20;
    let opts_end = tcp_start + data_offset;
    let modified = strip_options(&mut buf[opts_start..opts_end]);

    if modified {
        let mut src_octets = [0u8; 16];
        src_octets.copy_from_slice(&buf[8..24]);
        let mut dst_octets = [0u8; 16];
        dst_octets.copy_from_slice(&buf[24..40]);
        let src = Ipv6Addr::from(src_octets);
        let dst = Ipv6Addr::from(dst_octets);
        buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&[0, 0]);
        let sum = ipv6::tcp_checksum(src, dst, &buf[tcp_start..total_len]);
        buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&sum.to_be_bytes());
    }

    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn build_syn_with_options(options: &[u8]) -> Vec<u8> {
        let opt_len = options.len();
        let doff_words = (20 + opt_len).div_ceil(4);
        let padded_opt_len = doff_words * 4 - 20;
        let mut padded_options = options.to_vec();
        padded_options.resize(padded_opt_len, OPT_NOP);

        let total_len = 20 + 20 + padded_opt_len;
        let mut buf = vec![0u8; total_len];
        buf[0] = 0x45;
        buf[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
        buf[8] = 64;
        buf[9] = ipv4::PROTO_TCP;
        buf[12..16].copy_from_slice(&Ipv4Addr::new(10, 0, 0, 1).octets());
        buf[16..20].copy_from_slice(&Ipv4Addr::new(10, 0, 0, 2).octets());

        let tcp_start = 20;
        buf[tcp_start + 12] = (doff_words as u8) << 4;
        buf[tcp_start + 13] = feint_common::tcp_flags::SYN;
        buf[tcp_start + 20..tcp_start + 20 + padded_opt_len].copy_from_slice(&padded_options);

        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let sum = ipv4::tcp_checksum(src, dst, &buf[tcp_start..total_len]);
        buf[tcp_start + 16..tcp_start + 18].copy_from_slice(&sum.to_be_bytes());

        buf
    }

    #[test]
    fn strips_fastopen_cookie_and_preserves_others() {
        let options = [
            0x02, 0x04, 0x05, 0xb4, // MSS
            0x22, 0x08, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // TFO cookie (kind 34, len 8)
            0x01, // NOP
            0x03, 0x03, 0x07, // window scale
        ];
        let mut buf = build_syn_with_options(&options);

        let modified = strip_tfo_cookie(&mut buf).unwrap();
        assert!(modified);

        let tcp_start = 20;
        let data_offset = (buf[tcp_start + 12] >> 4) as usize * 4;
        let opts = &buf[tcp_start + 20..tcp_start + data_offset];
        assert_eq!(&opts[0..4], &[0x02, 0x04, 0x05, 0xb4]);
        assert_eq!(&opts[4..12], &[0x01; 8]);
        assert_eq!(opts[12], 0x01);
        assert_eq!(&opts[13..16], &[0x03, 0x03, 0x07]);

        // checksum still verifies
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let total_len = buf.len();
        assert_eq!(ipv4::tcp_checksum(src, dst, &buf[tcp_start..total_len]), 0);
    }

    #[test]
    fn idempotent_on_second_application() {
        let options = [0x22, 0x08, 1, 2, 3, 4, 5, 6, 0x01, 0x01];
        let mut buf = build_syn_with_options(&options);

        assert!(strip_tfo_cookie(&mut buf).unwrap());
        assert!(!strip_tfo_cookie(&mut buf).unwrap());
    }

    #[test]
    fn no_cookie_present_is_a_no_op() {
        let options = [0x02, 0x04, 0x05, 0xb4];
        let mut buf = build_syn_with_options(&options);
        assert!(!strip_tfo_cookie(&mut buf).unwrap());
    }
}
