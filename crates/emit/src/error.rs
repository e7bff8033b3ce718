use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("socket(): {0}")]
    Socket(std::io::Error),
    #[error("setsockopt({opt}): {source}")]
    SetSockOpt {
        opt: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("sendto(): {0}")]
    SendTo(std::io::Error),
    #[error("unresolvable interface index {0}")]
    UnknownInterface(u32),
}

impl EmitError {
    /// A permission-denied `socket()` failure is almost always a missing
    /// root/CAP_NET_RAW grant; surface that as a hint for logging.
    #[must_use]
    pub fn permission_hint(&self) -> Option<&'static str> {
        match self {
            EmitError::Socket(e) if e.raw_os_error() == Some(libc::EPERM) => {
                Some("are you root? this requires CAP_NET_RAW")
            }
            _ => None,
        }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;
