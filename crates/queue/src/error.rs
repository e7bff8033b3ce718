use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("nfq_open(): {0}")]
    Open(std::io::Error),
    #[error("nfq_create_queue(): {0}")]
    CreateQueue(std::io::Error),
    #[error("nfq_set_mode(): {0}")]
    SetMode(std::io::Error),
    #[error("nfq_set_queue_flags(): {0}")]
    SetFlags(std::io::Error),
    #[error("getsockopt/setsockopt(SO_RCVBUF): {0}")]
    RcvBuf(std::io::Error),
    #[error("too many consecutive recv errors, last: {0}")]
    TooManyErrors(std::io::Error),
}

impl QueueError {
    /// A hint for the operator, when the underlying errno suggests a
    /// specific missing permission or kernel module.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        let io_err = match self {
            QueueError::Open(e) | QueueError::CreateQueue(e) => e,
            _ => return None,
        };
        match io_err.raw_os_error() {
            Some(libc::EPERM) => Some("are you root?"),
            Some(libc::EINVAL) => Some("missing kernel module?"),
            _ => None,
        }
    }
}

pub type QueueResult<T> = Result<T, QueueError>;
