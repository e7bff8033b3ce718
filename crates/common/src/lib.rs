//! feint-common - shared types, config, and error plumbing
//!
//! Types used across the forging engine's crates: the tagged packet
//! view types (`TcpView`, `PacketView`), `Direction`/`Verdict`, the
//! payload descriptor enum, and the validated `EngineConfig`.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, InterfaceScope};
pub use error::{ConfigError, ConfigResult};
pub use types::{hop_estimate, tcp_flags, Direction, PacketView, PayloadDescriptor, TcpView, Verdict};
