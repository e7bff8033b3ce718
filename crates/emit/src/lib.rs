//! feint-emit - raw frame emission for forged TCP segments.
//!
//! `LinkSender` is the normal path: an AF_PACKET SOCK_DGRAM socket
//! addressed with the link-layer info the queue reported for the
//! packet being answered. `send_via_snat` is the rare fallback used
//! when the forged segment must be source-NATed by the host's own
//! POSTROUTING rules.

pub mod error;
pub mod link;
pub mod snat;

pub use error::{EmitError, EmitResult};
pub use link::{LinkAddr, LinkSender};
pub use snat::send_via_snat;

use std::net::IpAddr;

/// Picks between the link-layer path and the SNAT-fallback path for one
/// send, per spec.md §4.5. `iptables_mode` selects the fallback only
/// when it's true; the fallback additionally needs the outgoing
/// interface name, which the caller resolves from the queue's reported
/// interface index.
pub enum Destination<'a> {
    Link(LinkAddr, u16),
    Snat { dst: IpAddr, ifname: &'a str },
}

pub fn emit(
    sender: &LinkSender,
    destination: Destination<'_>,
    fwmark: u32,
    bytes: &[u8],
) -> EmitResult<()> {
    match destination {
        Destination::Link(addr, ethertype) => sender.send(addr, ethertype, bytes),
        Destination::Snat { dst, ifname } => send_via_snat(dst, ifname, fwmark, bytes),
    }
}
