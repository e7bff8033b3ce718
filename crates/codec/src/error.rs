use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("packet shorter than the minimum header size")]
    Truncated,

    #[error("unsupported IP version")]
    UnsupportedVersion,

    #[error("IPv4 IHL below the minimum 20-byte header")]
    InvalidIhl,

    #[error("IP total length inconsistent with header/segment lengths")]
    InvalidTotalLength,

    #[error("next header / protocol is not TCP")]
    NotTcp,

    #[error("IPv6 extension header chain is unsupported")]
    UnsupportedExtensionHeader,

    #[error("TCP data offset inconsistent with segment length")]
    InvalidDataOffset,

    #[error("destination buffer too small for the packet being built")]
    BufferTooSmall,

    #[error("mismatched address families between source and destination")]
    AddressFamilyMismatch,
}

pub type CodecResult<T> = Result<T, CodecError>;
