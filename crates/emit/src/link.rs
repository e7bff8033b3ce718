//! AF_PACKET SOCK_DGRAM sender: the normal emission path for forged
//! segments. Grounded on `original_source/src/rawsend.c`'s
//! `fh_rawsend_setup`/`send_http`/`send_ack`.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, RawFd};

use crate::error::{EmitError, EmitResult};

/// The minimum SO_RCVBUF the sender requests, since it never calls
/// `recv` on this socket.
const MIN_RCVBUF: libc::c_int = 128;
/// SO_PRIORITY set on forged frames, matching the original sender.
const SEND_PRIORITY: libc::c_int = 7;

/// Link-layer destination for one send: interface index, hardware
/// address, and its length, as reported by the netfilter queue for the
/// packet being answered.
#[derive(Debug, Clone, Copy)]
pub struct LinkAddr {
    pub ifindex: i32,
    pub halen: u8,
    pub addr: [u8; 8],
    pub pkttype: u8,
}

/// Owns one AF_PACKET SOCK_DGRAM socket, configured with the
/// injected-packet fwmark and minimal receive buffer.
pub struct LinkSender {
    fd: RawFd,
}

impl LinkSender {
    pub fn new(fwmark: u32) -> EmitResult<Self> {
        let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_DGRAM, (libc::ETH_P_ALL as u16).to_be() as i32) };
        if fd < 0 {
            return Err(EmitError::Socket(io::Error::last_os_error()));
        }
        let sender = Self { fd };

        sender.setsockopt(libc::SOL_SOCKET, libc::SO_MARK, "SO_MARK", fwmark as libc::c_int)?;
        sender.setsockopt(libc::SOL_SOCKET, libc::SO_PRIORITY, "SO_PRIORITY", SEND_PRIORITY)?;
        sender.setsockopt(libc::SOL_SOCKET, libc::SO_RCVBUF, "SO_RCVBUF", MIN_RCVBUF)?;

        Ok(sender)
    }

    fn setsockopt(
        &self,
        level: libc::c_int,
        name: libc::c_int,
        label: &'static str,
        value: libc::c_int,
    ) -> EmitResult<()> {
        let res = unsafe {
            libc::setsockopt(
                self.fd,
                level,
                name,
                &value as *const _ as *const libc::c_void,
                mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if res < 0 {
            return Err(EmitError::SetSockOpt {
                opt: label,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Send one forged link-layer frame toward `dst`, carrying `bytes`
    /// (an already-built IPv4/IPv6+TCP segment) as the payload.
    pub fn send(&self, dst: LinkAddr, ethertype: u16, bytes: &[u8]) -> EmitResult<()> {
        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = ethertype.to_be();
        sll.sll_ifindex = dst.ifindex;
        sll.sll_halen = dst.halen as u16;
        sll.sll_pkttype = dst.pkttype;
        let halen = dst.halen as usize;
        sll.sll_addr[..halen.min(8)].copy_from_slice(&dst.addr[..halen.min(8)]);

        let res = unsafe {
            libc::sendto(
                self.fd,
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
                0,
                &sll as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if res < 0 {
            return Err(EmitError::SendTo(io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl AsRawFd for LinkSender {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for LinkSender {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe {
                libc::close(self.fd);
            }
        }
    }
}
