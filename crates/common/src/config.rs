//! Immutable engine configuration, validated once at startup.

use crate::error::{ConfigError, ConfigResult};
use crate::types::PayloadDescriptor;

/// Which network interfaces the engine should accept traffic from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceScope {
    All,
    Named(Vec<String>),
}

/// Read-only configuration shared by every component, built once at
/// startup and passed by reference through the queue-reader/engine
/// boundary (spec.md §9's "ambient globals -> explicit context" note).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub process_inbound: bool,
    pub process_outbound: bool,
    pub use_ipv4: bool,
    pub use_ipv6: bool,
    pub interfaces: InterfaceScope,
    pub repeat: u32,
    pub base_ttl: u8,
    pub dynamic_ttl_pct: u8,
    pub no_hop_estimate: bool,
    pub fwmark: u32,
    pub fwmask: u32,
    pub queue_num: u16,
    pub packet_count_threshold: u32,
    pub use_iptables: bool,
    pub skip_firewall: bool,
    pub payload_descriptors: Vec<PayloadDescriptor>,
    /// Interface the SNAT-fallback raw socket binds to (`-i`). Only
    /// required in iptables mode; the per-rule interface scope is
    /// tracked separately by `interfaces`.
    pub snat_iface: Option<String>,
}

impl EngineConfig {
    /// Validate cross-field invariants from spec.md §6. Construction
    /// failures are fatal-setup errors reported before any socket or
    /// queue is opened.
    pub fn validate(self) -> ConfigResult<Self> {
        if (self.fwmark & self.fwmask) != self.fwmark {
            return Err(ConfigError::MarkMaskMismatch {
                mark: self.fwmark,
                mask: self.fwmask,
            });
        }
        if !(1..=10).contains(&self.repeat) {
            return Err(ConfigError::RepeatOutOfRange(self.repeat));
        }
        if !(1..=255).contains(&(self.base_ttl as u32)) {
            return Err(ConfigError::BaseTtlOutOfRange(self.base_ttl as u32));
        }
        if self.dynamic_ttl_pct as u32 > 99 {
            return Err(ConfigError::DynamicPctOutOfRange(self.dynamic_ttl_pct as u32));
        }
        if self.dynamic_ttl_pct != 0 && self.no_hop_estimate {
            return Err(ConfigError::DynamicPctWithNoHopEstimate);
        }
        if !self.use_ipv4 && !self.use_ipv6 {
            return Err(ConfigError::NoAddressFamilyEnabled);
        }
        if self.payload_descriptors.is_empty() {
            return Err(ConfigError::NoPayloadDescriptors);
        }
        if self.packet_count_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if let InterfaceScope::Named(names) = &self.interfaces {
            for name in names {
                if name.is_empty() || name.len() >= libc::IFNAMSIZ {
                    return Err(ConfigError::InvalidInterface(name.clone()));
                }
            }
        }
        if self.use_iptables {
            match &self.snat_iface {
                Some(name) if !name.is_empty() && name.len() < libc::IFNAMSIZ => {}
                _ => return Err(ConfigError::MissingSnatInterface),
            }
        }
        Ok(self)
    }

    /// TTL to place on a forged segment given the observed TTL of the
    /// triggering packet, per spec.md §4.7's hop-estimation rule.
    #[must_use]
    pub fn forged_ttl(&self, observed_hops: u8) -> u8 {
        if self.dynamic_ttl_pct == 0 {
            return self.base_ttl;
        }
        let dynamic = (observed_hops as u32 * self.dynamic_ttl_pct as u32) / 100;
        self.base_ttl.max(dynamic.min(u8::MAX as u32) as u8)
    }

    /// Whether a packet observed at `ttl` should be treated as local
    /// traffic and skipped, per spec.md §4.7.
    #[must_use]
    pub fn is_local(&self, ttl: u8) -> bool {
        if self.no_hop_estimate {
            return false;
        }
        crate::types::hop_estimate(ttl) <= self.base_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            process_inbound: true,
            process_outbound: true,
            use_ipv4: true,
            use_ipv6: false,
            interfaces: InterfaceScope::All,
            repeat: 2,
            base_ttl: 3,
            dynamic_ttl_pct: 0,
            no_hop_estimate: false,
            fwmark: 0x1000,
            fwmask: 0x1000,
            queue_num: 0,
            packet_count_threshold: 32,
            use_iptables: false,
            skip_firewall: false,
            payload_descriptors: vec![PayloadDescriptor::Http("example.com".into())],
            snat_iface: None,
        }
    }

    #[test]
    fn rejects_iptables_mode_without_snat_interface() {
        let mut cfg = base_config();
        cfg.use_iptables = true;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingSnatInterface)
        ));
    }

    #[test]
    fn accepts_iptables_mode_with_snat_interface() {
        let mut cfg = base_config();
        cfg.use_iptables = true;
        cfg.snat_iface = Some("eth0".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validates_happy_path() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_mark_mask_mismatch() {
        let mut cfg = base_config();
        cfg.fwmark = 0x3;
        cfg.fwmask = 0x1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MarkMaskMismatch { .. })
        ));
    }

    #[test]
    fn rejects_dynamic_pct_with_no_hop_estimate() {
        let mut cfg = base_config();
        cfg.dynamic_ttl_pct = 50;
        cfg.no_hop_estimate = true;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DynamicPctWithNoHopEstimate)
        ));
    }

    #[test]
    fn forged_ttl_uses_base_when_dynamic_disabled() {
        let cfg = base_config();
        assert_eq!(cfg.forged_ttl(40), 3);
    }

    #[test]
    fn forged_ttl_uses_max_of_base_and_dynamic() {
        let mut cfg = base_config();
        cfg.dynamic_ttl_pct = 50;
        assert_eq!(cfg.forged_ttl(40), 20);
        assert_eq!(cfg.forged_ttl(2), 3);
    }

    #[test]
    fn local_suppression_matches_hop_estimate() {
        let cfg = base_config();
        assert!(cfg.is_local(62));
        assert!(!cfg.is_local(54));
    }
}
