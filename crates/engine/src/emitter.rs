//! Emission abstraction so the dispatch logic in [`crate::InjectionEngine`]
//! can be exercised without opening real sockets (`LinkSender::new` and
//! `send_via_snat` both require `CAP_NET_RAW`). Production code uses
//! [`RawEmitter`]; tests supply a recording mock.

use std::net::IpAddr;

use feint_emit::{EmitResult, LinkAddr, LinkSender};

pub trait Emitter {
    fn send_link(&self, addr: LinkAddr, ethertype: u16, bytes: &[u8]) -> EmitResult<()>;
    fn send_snat(&self, dst: IpAddr, ifname: &str, mark: u32, bytes: &[u8]) -> EmitResult<()>;
}

/// The production emitter: a single long-lived `LinkSender` for the
/// default path, and the transient-raw-socket helper for SNAT fallback.
pub struct RawEmitter {
    sender: LinkSender,
}

impl RawEmitter {
    pub fn new(fwmark: u32) -> EmitResult<Self> {
        Ok(Self {
            sender: LinkSender::new(fwmark)?,
        })
    }
}

impl Emitter for RawEmitter {
    fn send_link(&self, addr: LinkAddr, ethertype: u16, bytes: &[u8]) -> EmitResult<()> {
        self.sender.send(addr, ethertype, bytes)
    }

    fn send_snat(&self, dst: IpAddr, ifname: &str, mark: u32, bytes: &[u8]) -> EmitResult<()> {
        feint_emit::send_via_snat(dst, ifname, mark, bytes)
    }
}
