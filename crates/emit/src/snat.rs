//! SNAT-fallback raw socket path (spec.md §4.5): used when an injected
//! segment must pass back through the host's own POSTROUTING rules
//! (iptables mode, inbound direction). Each send opens a transient
//! socket, binds it to the outgoing interface, and closes it
//! afterward — accepted as rare and therefore not performance-critical.

use std::io;
use std::mem;
use std::net::IpAddr;
use std::os::fd::RawFd;

use crate::error::{EmitError, EmitResult};

fn bind_to_device(fd: RawFd, ifname: &str) -> EmitResult<()> {
    let mut ifreq_name = [0i8; libc::IFNAMSIZ];
    for (slot, byte) in ifreq_name.iter_mut().zip(ifname.bytes()) {
        *slot = byte as i8;
    }
    let res = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            ifreq_name.as_ptr() as *const libc::c_void,
            libc::IFNAMSIZ as libc::socklen_t,
        )
    };
    if res < 0 {
        return Err(EmitError::SetSockOpt {
            opt: "SO_BINDTODEVICE",
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

fn set_mark(fd: RawFd, mark: u32) -> EmitResult<()> {
    let value = mark as libc::c_int;
    let res = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_MARK,
            &value as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if res < 0 {
        return Err(EmitError::SetSockOpt {
            opt: "SO_MARK",
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Open a transient `SOCK_RAW(IPPROTO_RAW)` socket on `dst`'s address
/// family, bind it to `ifname`, mark it with `fwmark`, send `bytes`
/// (a fully-built IP+TCP segment) to `dst`, then close it.
pub fn send_via_snat(dst: IpAddr, ifname: &str, fwmark: u32, bytes: &[u8]) -> EmitResult<()> {
    let (domain, addr_len, sockaddr_storage) = match dst {
        IpAddr::V4(v4) => {
            let mut sa: libc::sockaddr_in = unsafe { mem::zeroed() };
            sa.sin_family = libc::AF_INET as libc::sa_family_t;
            sa.sin_addr.s_addr = u32::from_ne_bytes(v4.octets());
            (libc::AF_INET, mem::size_of::<libc::sockaddr_in>(), Storage::V4(sa))
        }
        IpAddr::V6(v6) => {
            let mut sa: libc::sockaddr_in6 = unsafe { mem::zeroed() };
            sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sa.sin6_addr.s6_addr = v6.octets();
            (
                libc::AF_INET6,
                mem::size_of::<libc::sockaddr_in6>(),
                Storage::V6(sa),
            )
        }
    };

    let fd = unsafe { libc::socket(domain, libc::SOCK_RAW, libc::IPPROTO_RAW) };
    if fd < 0 {
        return Err(EmitError::Socket(io::Error::last_os_error()));
    }

    let result = (|| -> EmitResult<()> {
        bind_to_device(fd, ifname)?;
        set_mark(fd, fwmark)?;

        let res = match &sockaddr_storage {
            Storage::V4(sa) => unsafe {
                libc::sendto(
                    fd,
                    bytes.as_ptr() as *const libc::c_void,
                    bytes.len(),
                    0,
                    sa as *const _ as *const libc::sockaddr,
                    addr_len as libc::socklen_t,
                )
            },
            Storage::V6(sa) => unsafe {
                libc::sendto(
                    fd,
                    bytes.as_ptr() as *const libc::c_void,
                    bytes.len(),
                    0,
                    sa as *const _ as *const libc::sockaddr,
                    addr_len as libc::socklen_t,
                )
            },
        };
        if res < 0 {
            return Err(EmitError::SendTo(io::Error::last_os_error()));
        }
        Ok(())
    })();

    unsafe {
        libc::close(fd);
    }

    result
}

enum Storage {
    V4(libc::sockaddr_in),
    V6(libc::sockaddr_in6),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_to_device_rejects_overlong_name() {
        // this only exercises the truncation-safe copy loop; actually
        // opening a socket requires root/CAP_NET_RAW so isn't exercised
        // here.
        let long_name = "a".repeat(64);
        let mut ifreq_name = [0i8; libc::IFNAMSIZ];
        for (slot, byte) in ifreq_name.iter_mut().zip(long_name.bytes()) {
            *slot = byte as i8;
        }
        assert_eq!(ifreq_name.len(), libc::IFNAMSIZ);
    }
}
