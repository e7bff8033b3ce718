//! feint-rules - the firewall rule collaborator (spec.md §5's "out of
//! core" boundary). Installs the mangle-table/nftables rules that steer
//! matching TCP segments into the netfilter queue, with iptables and
//! nftables back-ends selected automatically unless the caller forces
//! one.

pub mod command;
pub mod error;
pub mod iptables;
pub mod nft;

pub use error::{RulesError, RulesResult};

use feint_common::EngineConfig;
use tracing::{info, warn};

/// Installs and removes the kernel-queue steering rules for one engine
/// run. Tracks which back-end actually ended up active, since that also
/// determines whether the emitter uses the SNAT-fallback path.
pub struct RuleInstaller {
    use_iptables: bool,
    skip_firewall: bool,
}

impl RuleInstaller {
    /// Decide the back-end: honor an explicit `use_iptables` request,
    /// otherwise probe for a working `nft` binary and fall back to
    /// iptables if it's missing.
    #[must_use]
    pub fn new(cfg: &EngineConfig) -> Self {
        let mut use_iptables = cfg.use_iptables;
        if cfg.skip_firewall {
            return Self {
                use_iptables,
                skip_firewall: true,
            };
        }
        if !use_iptables && !command::nft_is_working() {
            warn!("nft command not working, falling back to iptables");
            use_iptables = true;
        }
        Self {
            use_iptables,
            skip_firewall: false,
        }
    }

    #[must_use]
    pub fn is_iptables_mode(&self) -> bool {
        self.use_iptables
    }

    pub fn setup(&self, cfg: &EngineConfig) -> RulesResult<()> {
        if self.skip_firewall {
            info!("skipping firewall rule installation as requested");
            return Ok(());
        }

        if self.use_iptables {
            if cfg.use_ipv4 {
                iptables::setup_v4(cfg)?;
            }
            if cfg.use_ipv6 {
                iptables::setup_v6(cfg)?;
            }
        } else {
            if cfg.use_ipv4 {
                nft::setup_v4(cfg)?;
            }
            if cfg.use_ipv6 {
                nft::setup_v6(cfg)?;
            }
        }
        Ok(())
    }

    pub fn cleanup(&self, cfg: &EngineConfig) {
        if self.skip_firewall {
            return;
        }

        if self.use_iptables {
            if cfg.use_ipv4 {
                iptables::cleanup_v4();
            }
            if cfg.use_ipv6 {
                iptables::cleanup_v6();
            }
        } else {
            if cfg.use_ipv4 {
                nft::cleanup_v4();
            }
            if cfg.use_ipv6 {
                nft::cleanup_v6();
            }
        }
    }
}
