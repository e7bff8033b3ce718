use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("hostname too long for payload buffer")]
    HostnameTooLong,
    #[error("generated payload exceeds the 2000-byte buffer")]
    TooLarge,
    #[error("failed to read custom payload file {path}: {source}")]
    CustomFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("custom payload file {path} exceeds the 2KB limit ({len} bytes)")]
    CustomFileTooLarge { path: String, len: usize },
    #[error("payload ring has no entries")]
    EmptyRing,
}

pub type PayloadResult<T> = Result<T, PayloadError>;
