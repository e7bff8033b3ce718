//! Shared error types for configuration and validation failures.
//!
//! Per-component failure modes (codec parse errors, emit I/O errors, ...)
//! live in their owning crates; this module only covers the fatal-setup
//! class of error that can occur before any component is constructed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid fwmark/fwmask: (mark & mask) must equal mark (mark=0x{mark:08x}, mask=0x{mask:08x})")]
    MarkMaskMismatch { mark: u32, mask: u32 },

    #[error("repeat count {0} out of range [1,10]")]
    RepeatOutOfRange(u32),

    #[error("base TTL {0} out of range [1,255]")]
    BaseTtlOutOfRange(u32),

    #[error("dynamic TTL percentage {0} out of range [0,99]")]
    DynamicPctOutOfRange(u32),

    #[error("dynamic TTL percentage and --no-hop-estimate are mutually exclusive")]
    DynamicPctWithNoHopEstimate,

    #[error("no address family enabled: at least one of IPv4/IPv6 must be selected")]
    NoAddressFamilyEnabled,

    #[error("no payload descriptor supplied")]
    NoPayloadDescriptors,

    #[error("invalid payload descriptor '{0}': {1}")]
    InvalidDescriptor(String, String),

    #[error("invalid interface name '{0}'")]
    InvalidInterface(String),

    #[error("packet-count threshold must be nonzero")]
    ZeroThreshold,

    #[error("iptables-mode requires --interface for the SNAT-fallback raw socket")]
    MissingSnatInterface,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
