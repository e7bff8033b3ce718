//! nftables rule set — the default back-end when the `nft` binary is
//! present and working. Grounded on `original_source/src/ipv4nft.c`,
//! adapted from its `nft <quoted-command-string>` invocations to
//! argument-vector `nft add ...` calls.

use feint_common::{EngineConfig, InterfaceScope};

use crate::command::{run, run_best_effort};
use crate::error::RulesResult;

const TABLE: &str = "feint";

fn setup_common(
    family: &'static str,
    saddr_keyword: &'static str,
    local_ranges: &[&str],
    cfg: &EngineConfig,
) -> RulesResult<()> {
    cleanup_common(family);

    run(
        "nft",
        &["add", "table", family, TABLE],
        false,
    )?;
    run(
        "nft",
        &["add", "chain", family, TABLE, "prerouting", "{", "type", "filter", "hook", "prerouting", "priority", "-150", ";", "}"],
        false,
    )?;
    run("nft", &["add", "chain", family, TABLE, "rules"], false)?;

    let mark_hex = format!("0x{:x}", cfg.fwmark);
    let mask_hex = format!("0x{:x}", cfg.fwmask);
    run(
        "nft",
        &["add", "rule", family, TABLE, "rules", "mark", "and", &mask_hex, "==", &mark_hex, "return"],
        false,
    )?;

    for range in local_ranges {
        run(
            "nft",
            &["add", "rule", family, TABLE, "rules", saddr_keyword, "saddr", range, "return"],
            false,
        )?;
    }

    let queue_str = cfg.queue_num.to_string();
    run(
        "nft",
        &["add", "rule", family, TABLE, "rules", "tcp", "flags", "&", "(fin|rst|ack)", "==", "ack", "queue", "num", &queue_str, "bypass"],
        false,
    )?;

    match &cfg.interfaces {
        InterfaceScope::All => {
            run("nft", &["add", "rule", family, TABLE, "prerouting", "jump", "rules"], false)?;
        }
        InterfaceScope::Named(names) => {
            for name in names {
                run("nft", &["add", "rule", family, TABLE, "prerouting", "iifname", name, "jump", "rules"], false)?;
            }
        }
    }

    Ok(())
}

fn cleanup_common(family: &'static str) {
    run_best_effort("nft", &["delete", "table", family, TABLE]);
}

const IPV4_LOCAL_RANGES: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "224.0.0.0/3",
];

const IPV6_LOCAL_RANGES: &[&str] = &["::1/128", "fc00::/7", "fe80::/10", "ff00::/8"];

pub fn setup_v4(cfg: &EngineConfig) -> RulesResult<()> {
    setup_common("ip", "ip", IPV4_LOCAL_RANGES, cfg)
}

pub fn cleanup_v4() {
    cleanup_common("ip");
}

pub fn setup_v6(cfg: &EngineConfig) -> RulesResult<()> {
    setup_common("ip6", "ip6", IPV6_LOCAL_RANGES, cfg)
}

pub fn cleanup_v6() {
    cleanup_common("ip6");
}
