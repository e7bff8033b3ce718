//! Core wire-adjacent types shared across the engine's crates.

use std::net::IpAddr;

/// TCP flag bit values, matching the wire layout of the flags octet.
pub mod tcp_flags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;
    pub const URG: u8 = 0x20;
}

/// A borrowed view of a TCP header plus the flags helpers used by the
/// injection engine's dispatch table. Lifetime is the queue dispatch.
#[derive(Debug, Clone, Copy)]
pub struct TcpView<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: u8,
    pub data_offset: u8,
    pub window: u16,
    /// Raw option bytes (between the fixed 20-byte header and payload).
    pub options: &'a [u8],
}

impl<'a> TcpView<'a> {
    #[inline]
    #[must_use]
    pub const fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_syn_ack(&self) -> bool {
        self.has(tcp_flags::SYN) && self.has(tcp_flags::ACK)
    }

    #[inline]
    #[must_use]
    pub const fn is_syn_only(&self) -> bool {
        self.has(tcp_flags::SYN) && !self.has(tcp_flags::ACK)
    }

    #[inline]
    #[must_use]
    pub const fn is_ack_only(&self) -> bool {
        self.has(tcp_flags::ACK) && !self.has(tcp_flags::SYN)
    }

    #[inline]
    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.has(tcp_flags::SYN) || self.has(tcp_flags::FIN) || self.has(tcp_flags::RST)
    }

    #[inline]
    #[must_use]
    pub const fn is_fin_or_rst(&self) -> bool {
        self.has(tcp_flags::FIN) || self.has(tcp_flags::RST)
    }
}

/// A borrowed, parsed view of one intercepted packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'a> {
    pub src: IpAddr,
    pub dst: IpAddr,
    /// Observed IPv4 TTL or IPv6 hop limit.
    pub ttl: u8,
    pub tcp: TcpView<'a>,
    pub tcp_payload_len: usize,
}

/// Direction a packet traveled through the queue, derived from which
/// interface index the kernel reports as nonzero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Arrived on the input path (egress index is zero): traffic from our host.
    FromHost,
    /// Leaving via the output path (egress index nonzero): traffic to our host.
    ToHost,
}

impl Direction {
    #[inline]
    #[must_use]
    pub const fn from_interface_indices(in_ifindex: u32, out_ifindex: u32) -> Self {
        if out_ifindex != 0 {
            Direction::ToHost
        } else {
            let _ = in_ifindex;
            Direction::FromHost
        }
    }
}

/// Verdict returned by the injection engine to the queue reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Drop,
    RepeatWithMark(u32),
}

/// Estimate the number of network hops a packet has traveled given its
/// observed TTL, per spec.md's 64/128/255 initial-TTL ceiling heuristic.
#[inline]
#[must_use]
pub const fn hop_estimate(ttl: u8) -> u8 {
    if ttl <= 64 {
        64 - ttl
    } else if ttl <= 128 {
        128 - ttl
    } else {
        255 - ttl
    }
}

/// Descriptor for one entry in the payload ring, as supplied on the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDescriptor {
    Http(String),
    Https(String),
    TlsClientHello(String),
    Custom(String),
    HttpRandom(String),
    HttpSimple,
    HttpZeroRate,
}

impl std::fmt::Display for PayloadDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadDescriptor::Http(h) => write!(f, "http:{h}"),
            PayloadDescriptor::Https(h) => write!(f, "https:{h}"),
            PayloadDescriptor::TlsClientHello(h) => write!(f, "tls:{h}"),
            PayloadDescriptor::Custom(p) => write!(f, "custom:{p}"),
            PayloadDescriptor::HttpRandom(h) => write!(f, "http-random:{h}"),
            PayloadDescriptor::HttpSimple => write!(f, "http-simple"),
            PayloadDescriptor::HttpZeroRate => write!(f, "http-zerorate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_estimate_ranges() {
        assert_eq!(hop_estimate(64), 0);
        assert_eq!(hop_estimate(62), 2);
        assert_eq!(hop_estimate(128), 0);
        assert_eq!(hop_estimate(120), 8);
        assert_eq!(hop_estimate(255), 0);
        assert_eq!(hop_estimate(200), 55);
    }

    #[test]
    fn direction_from_indices() {
        assert_eq!(Direction::from_interface_indices(2, 0), Direction::FromHost);
        assert_eq!(Direction::from_interface_indices(0, 3), Direction::ToHost);
    }

    #[test]
    fn tcp_view_flag_helpers() {
        let view = TcpView {
            src_port: 1,
            dst_port: 2,
            seq: 0,
            ack: 0,
            flags: tcp_flags::SYN | tcp_flags::ACK,
            data_offset: 5,
            window: 0,
            options: &[],
        };
        assert!(view.is_syn_ack());
        assert!(!view.is_syn_only());
        assert!(!view.is_fin_or_rst());
    }
}
