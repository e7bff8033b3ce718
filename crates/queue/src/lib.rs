//! feint-queue - the netfilter queue reader (spec.md §4.6).
//!
//! Owns the `nfq` queue handle: setup with classified error hints,
//! the blocking recv loop with the EINTR/soft-error/fatal-error
//! split, and verdict application. The engine itself lives in
//! `feint-engine`; this crate only knows how to pull packets off the
//! queue and push verdicts back, via the `PacketHandler` callback.

pub mod error;

pub use error::{QueueError, QueueResult};

use nfq::{CopyMode, Queue as NfQueue, Verdict as NfqVerdict};
use std::io;
use std::mem;
use std::os::fd::AsRawFd;
use tracing::{error, warn};

use feint_common::{Direction, Verdict};

/// Minimum value to force SO_RCVBUF up to if the kernel default is
/// smaller, per spec.md §4.6.
const MIN_RCVBUF: libc::c_int = 1024 * 1024;
/// Consecutive soft/hard recv errors after which the loop gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 20;

/// One packet handed to the injection engine: the queue-assigned id
/// plus everything the engine's dispatch table needs.
pub struct PacketContext<'a> {
    pub direction: Direction,
    pub ethertype: u16,
    pub link_ifindex: i32,
    pub link_halen: u8,
    pub link_addr: [u8; 8],
    pub bytes: &'a [u8],
}

/// Result of handling one packet: the verdict to return to the kernel,
/// and — when the engine mutated the packet in place (e.g. TFO cookie
/// stripped) — the replacement bytes to submit with the verdict.
pub struct HandleOutcome {
    pub verdict: Verdict,
    pub modified_bytes: Option<Vec<u8>>,
}

pub trait PacketHandler {
    fn handle(&mut self, ctx: PacketContext<'_>) -> HandleOutcome;
}

impl<F> PacketHandler for F
where
    F: FnMut(PacketContext<'_>) -> HandleOutcome,
{
    fn handle(&mut self, ctx: PacketContext<'_>) -> HandleOutcome {
        self(ctx)
    }
}

pub struct QueueReader {
    queue: NfQueue,
    queue_num: u16,
}

impl QueueReader {
    /// Open the netfilter queue handle and configure it per spec.md
    /// §4.6: full-packet copy mode, fail-open, and a receive buffer of
    /// at least 1 MiB.
    pub fn setup(queue_num: u16) -> QueueResult<Self> {
        let mut queue = NfQueue::open().map_err(QueueError::Open)?;
        queue
            .bind(queue_num)
            .map_err(QueueError::CreateQueue)?;
        queue
            .set_copy_mode(queue_num, CopyMode::Packet(0xffff))
            .map_err(QueueError::SetMode)?;
        queue
            .set_fail_open(queue_num, true)
            .map_err(QueueError::SetFlags)?;

        Self::raise_rcvbuf(&queue)?;

        Ok(Self { queue, queue_num })
    }

    fn raise_rcvbuf(queue: &NfQueue) -> QueueResult<()> {
        let fd = queue.as_raw_fd();
        let mut current: libc::c_int = 0;
        let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
        let res = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &mut current as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if res < 0 {
            return Err(QueueError::RcvBuf(io::Error::last_os_error()));
        }

        if current < MIN_RCVBUF {
            let res = unsafe {
                libc::setsockopt(
                    fd,
                    libc::SOL_SOCKET,
                    libc::SO_RCVBUFFORCE,
                    &MIN_RCVBUF as *const _ as *const libc::c_void,
                    mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if res < 0 {
                return Err(QueueError::RcvBuf(io::Error::last_os_error()));
            }
        }

        Ok(())
    }

    /// Run the blocking recv/dispatch/verdict loop until `should_exit`
    /// reports true. Per spec.md §4.6: EINTR retries silently,
    /// EAGAIN/ETIMEDOUT/ENOBUFS count as soft errors and continue, any
    /// other errno is fatal, and 20 consecutive errors of any kind is
    /// fatal.
    pub fn run(
        &mut self,
        mut handler: impl PacketHandler,
        mut should_exit: impl FnMut() -> bool,
    ) -> QueueResult<()> {
        let mut consecutive_errors: u32 = 0;

        while !should_exit() {
            if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                let err = io::Error::new(io::ErrorKind::Other, "too many consecutive errors");
                return Err(QueueError::TooManyErrors(err));
            }

            let mut msg = match self.queue.recv() {
                Ok(msg) => msg,
                Err(e) => {
                    match e.raw_os_error() {
                        Some(libc::EINTR) => continue,
                        Some(libc::EAGAIN) | Some(libc::ETIMEDOUT) | Some(libc::ENOBUFS) => {
                            consecutive_errors += 1;
                            warn!(error = %e, "soft recv error on netfilter queue");
                            continue;
                        }
                        _ => {
                            error!(error = %e, "fatal recv error on netfilter queue");
                            return Err(QueueError::TooManyErrors(e));
                        }
                    }
                }
            };

            let in_ifindex = msg.get_indev();
            let out_ifindex = msg.get_outdev();
            let direction = Direction::from_interface_indices(in_ifindex, out_ifindex);
            let ethertype = msg.get_hw_protocol();
            let (link_halen, link_addr) = match msg.get_hw_addr() {
                Some(addr) => {
                    let mut buf = [0u8; 8];
                    let len = addr.len().min(8);
                    buf[..len].copy_from_slice(&addr[..len]);
                    (len as u8, buf)
                }
                None => (0, [0u8; 8]),
            };

            let outcome = {
                let ctx = PacketContext {
                    direction,
                    ethertype,
                    link_ifindex: if out_ifindex != 0 {
                        out_ifindex as i32
                    } else {
                        in_ifindex as i32
                    },
                    link_halen,
                    link_addr,
                    bytes: msg.get_payload(),
                };
                handler.handle(ctx)
            };

            if let Some(bytes) = outcome.modified_bytes {
                msg.set_payload(bytes);
            }

            match outcome.verdict {
                Verdict::Accept => msg.set_verdict(NfqVerdict::Accept),
                Verdict::Drop => msg.set_verdict(NfqVerdict::Drop),
                Verdict::RepeatWithMark(mark) => {
                    msg.set_verdict(NfqVerdict::Repeat);
                    msg.set_nfmark(mark);
                }
            }

            if let Err(e) = self.queue.verdict(msg) {
                consecutive_errors += 1;
                error!(error = %e, "failed to apply verdict to netfilter queue");
                continue;
            }

            consecutive_errors = 0;
        }

        Ok(())
    }

    #[must_use]
    pub fn queue_num(&self) -> u16 {
        self.queue_num
    }
}
