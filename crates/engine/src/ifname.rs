//! Interface-index to name resolution, needed only for the SNAT
//! fallback path's `SO_BINDTODEVICE` call (spec.md §4.5): the kernel
//! queue reports an interface index, but a raw socket binds by name.

use std::ffi::CStr;

/// Resolve `ifindex` to its interface name via `if_indextoname`.
/// Returns `None` if the index no longer refers to a live interface
/// (e.g. it was torn down between the queue callback and this lookup).
#[must_use]
pub fn resolve(ifindex: i32) -> Option<String> {
    if ifindex <= 0 {
        return None;
    }
    let mut buf = [0u8; libc::IFNAMSIZ];
    let res = unsafe { libc::if_indextoname(ifindex as u32, buf.as_mut_ptr().cast()) };
    if res.is_null() {
        return None;
    }
    let cstr = unsafe { CStr::from_ptr(buf.as_ptr().cast()) };
    cstr.to_str().ok().map(str::to_owned)
}
