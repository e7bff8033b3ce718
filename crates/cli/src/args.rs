//! Command-line surface and its translation into an [`EngineConfig`].
//!
//! Ports the option table in spec.md §6 one-for-one onto `clap`-derive
//! flags, in the same flat (no-subcommand) shape as
//! `original_source/src/mainfun.c`'s `getopt` table, since this binary
//! runs exactly one daemon loop rather than dispatching between
//! subcommands.

use clap::Parser;

use feint_common::config::InterfaceScope;
use feint_common::error::{ConfigError, ConfigResult};
use feint_common::types::PayloadDescriptor;
use feint_common::EngineConfig;

#[derive(Parser, Debug)]
#[command(name = "feintd")]
#[command(version)]
#[command(about = "Forges short-TTL decoy HTTP/TLS segments to confuse DPI middleboxes", long_about = None)]
pub struct Cli {
    /// Process the to-host path (replies arriving for connections we initiated).
    #[arg(long)]
    pub inbound: bool,

    /// Process the from-host path (connections initiated on this machine).
    #[arg(long)]
    pub outbound: bool,

    /// Enable IPv4 handling.
    #[arg(long = "ipv4")]
    pub ipv4: bool,

    /// Enable IPv6 handling.
    #[arg(long = "ipv6")]
    pub ipv6: bool,

    /// Network interface to scope rule installation and the SNAT
    /// fallback socket to. Repeat for multiple; omit with
    /// --all-interfaces to match every interface.
    #[arg(short = 'i', long = "interface")]
    pub interfaces: Vec<String>,

    /// Match traffic on every interface instead of a named subset.
    #[arg(long)]
    pub all_interfaces: bool,

    /// Payload descriptor, e.g. `http:example.com`, `https:example.com`,
    /// `tls:example.com`, `custom:/path/to/file`, `http-random:example.com`,
    /// `http-simple`, `http-zerorate`. Repeat to populate the payload
    /// ring with more than one descriptor.
    #[arg(short = 'p', long = "payload", required = true)]
    pub payloads: Vec<String>,

    /// fwmark applied to forged/repeated packets so rules don't re-queue them.
    #[arg(short = 'm', long, default_value_t = 0x1000)]
    pub fwmark: u32,

    /// Mask paired with --fwmark; defaults to --fwmark itself.
    #[arg(short = 'x', long)]
    pub fwmask: Option<u32>,

    /// Netfilter queue number.
    #[arg(short = 'n', long, default_value_t = 0)]
    pub queue_num: u16,

    /// Duplicate each forged segment this many times [1,10].
    #[arg(short = 'r', long, default_value_t = 2)]
    pub repeat: u32,

    /// Base TTL placed on forged segments [1,255].
    #[arg(short = 't', long, default_value_t = 3)]
    pub ttl: u8,

    /// Dynamic TTL percentage of the estimated hop count [0,99];
    /// mutually exclusive with --no-hop-estimate.
    #[arg(long, default_value_t = 0)]
    pub dynamic_pct: u8,

    /// Disable hop-estimate based suppression of local traffic.
    #[arg(long)]
    pub no_hop_estimate: bool,

    /// Packet count after which a mid-connection injection fires.
    #[arg(long, default_value_t = 32)]
    pub packet_count_threshold: u32,

    /// Use iptables instead of nft, and enable the SNAT fallback path.
    #[arg(short = 'z', long)]
    pub iptables_mode: bool,

    /// Do not install or remove firewall rules.
    #[arg(short = 'f', long)]
    pub skip_firewall: bool,

    /// Write log output to this file instead of stderr.
    #[arg(short = 'w', long = "log-file")]
    pub log_file: Option<String>,

    /// Suppress per-packet state-mnemonic log lines.
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Detach and run as a background daemon.
    #[arg(short = 'd', long)]
    pub daemon: bool,

    /// Signal the already-running instance of this binary to stop, then exit.
    #[arg(short = 'k', long = "kill-running")]
    pub kill_running: bool,
}

impl Cli {
    /// Build and validate the engine configuration this invocation
    /// describes. Does not touch the network or filesystem beyond
    /// parsing; all of spec.md §6's invariants are enforced here so
    /// failures surface before any socket or queue is opened.
    pub fn into_engine_config(self) -> ConfigResult<EngineConfig> {
        let fwmask = self.fwmask.unwrap_or(self.fwmark);

        let interfaces = if self.all_interfaces || self.interfaces.is_empty() {
            InterfaceScope::All
        } else {
            InterfaceScope::Named(self.interfaces.clone())
        };

        let snat_iface = self.interfaces.first().cloned();

        let payload_descriptors = self
            .payloads
            .iter()
            .map(|s| parse_descriptor(s))
            .collect::<ConfigResult<Vec<_>>>()?;

        let cfg = EngineConfig {
            process_inbound: self.inbound,
            process_outbound: self.outbound,
            use_ipv4: self.ipv4,
            use_ipv6: self.ipv6,
            interfaces,
            repeat: self.repeat,
            base_ttl: self.ttl,
            dynamic_ttl_pct: self.dynamic_pct,
            no_hop_estimate: self.no_hop_estimate,
            fwmark: self.fwmark,
            fwmask,
            queue_num: self.queue_num,
            packet_count_threshold: self.packet_count_threshold,
            use_iptables: self.iptables_mode,
            skip_firewall: self.skip_firewall,
            payload_descriptors,
            snat_iface,
        };

        cfg.validate()
    }
}

/// Parse one `--payload` value into a [`PayloadDescriptor`]. The prefix
/// grammar is the exact inverse of `PayloadDescriptor`'s `Display` impl.
fn parse_descriptor(raw: &str) -> ConfigResult<PayloadDescriptor> {
    let invalid = |reason: &str| ConfigError::InvalidDescriptor(raw.to_string(), reason.to_string());

    if raw == "http-simple" {
        return Ok(PayloadDescriptor::HttpSimple);
    }
    if raw == "http-zerorate" {
        return Ok(PayloadDescriptor::HttpZeroRate);
    }

    let (prefix, rest) = raw
        .split_once(':')
        .ok_or_else(|| invalid("expected '<kind>:<argument>', or 'http-simple'/'http-zerorate'"))?;

    if rest.is_empty() {
        return Err(invalid("argument must not be empty"));
    }

    match prefix {
        "http" => Ok(PayloadDescriptor::Http(rest.to_string())),
        "https" | "tls" => Ok(PayloadDescriptor::Https(rest.to_string())),
        "custom" => Ok(PayloadDescriptor::Custom(rest.to_string())),
        "http-random" => Ok(PayloadDescriptor::HttpRandom(rest.to_string())),
        other => Err(invalid(&format!("unrecognized descriptor kind '{other}'"))),
    }
}
