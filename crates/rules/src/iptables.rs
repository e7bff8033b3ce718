//! iptables mangle-table rule set. Grounded on
//! `original_source/src/ipv4ipt.c`/`ipv6ipt.c`: a dedicated jump chain
//! off PREROUTING, an exclusion chain that skips already-marked
//! traffic and local address ranges, then a queue-bypass NFQUEUE jump.

use feint_common::{EngineConfig, InterfaceScope};

use crate::command::{run, run_best_effort};
use crate::error::RulesResult;

const CHAIN: &str = "FEINT";
const CHAIN_RULES: &str = "FEINT_R";

fn xmark(cfg: &EngineConfig) -> String {
    format!("{}/{}", cfg.fwmark, cfg.fwmask)
}

fn setup_common(program: &'static str, family_local_ranges: &[&str], cfg: &EngineConfig) -> RulesResult<()> {
    cleanup_common(program);

    run(program, &["-w", "-t", "mangle", "-N", CHAIN], false)?;
    run(program, &["-w", "-t", "mangle", "-I", "PREROUTING", "-j", CHAIN], false)?;
    run(program, &["-w", "-t", "mangle", "-N", CHAIN_RULES], false)?;

    let xmark_str = xmark(cfg);
    run(
        program,
        &["-w", "-t", "mangle", "-A", CHAIN_RULES, "-m", "mark", "--mark", &xmark_str, "-j", "CONNMARK", "--set-xmark", &xmark_str],
        false,
    )?;
    run(
        program,
        &["-w", "-t", "mangle", "-A", CHAIN_RULES, "-m", "connmark", "--mark", &xmark_str, "-j", "MARK", "--set-xmark", &xmark_str],
        false,
    )?;
    run(
        program,
        &["-w", "-t", "mangle", "-A", CHAIN_RULES, "-m", "mark", "--mark", &xmark_str, "-j", "RETURN"],
        false,
    )?;

    for range in family_local_ranges {
        run(program, &["-w", "-t", "mangle", "-A", CHAIN_RULES, "-s", range, "-j", "RETURN"], false)?;
    }

    let queue_str = cfg.queue_num.to_string();
    run(
        program,
        &[
            "-w", "-t", "mangle", "-A", CHAIN_RULES, "-p", "tcp", "--tcp-flags", "ACK,FIN,RST", "ACK", "-j", "NFQUEUE", "--queue-bypass", "--queue-num", &queue_str,
        ],
        false,
    )?;

    // best-effort narrowing rules: they tighten matching but their
    // absence (older iptables) shouldn't block startup.
    let connbytes = "0:32";
    run_best_effort(
        program,
        &["-w", "-t", "mangle", "-I", CHAIN_RULES, "-m", "connbytes", "!", "--connbytes", connbytes, "--connbytes-dir", "both", "--connbytes-mode", "packets", "-j", "RETURN"],
    );
    run_best_effort(program, &["-w", "-t", "mangle", "-I", CHAIN_RULES, "-m", "length", "!", "--length", "0:120", "-j", "RETURN"]);

    match &cfg.interfaces {
        InterfaceScope::All => {
            run(program, &["-w", "-t", "mangle", "-A", CHAIN, "-j", CHAIN_RULES], false)?;
        }
        InterfaceScope::Named(names) => {
            for name in names {
                run(program, &["-w", "-t", "mangle", "-A", CHAIN, "-i", name, "-j", CHAIN_RULES], false)?;
            }
        }
    }

    Ok(())
}

fn cleanup_common(program: &'static str) {
    run_best_effort(program, &["-w", "-t", "mangle", "-F", CHAIN_RULES]);
    run_best_effort(program, &["-w", "-t", "mangle", "-F", CHAIN]);
    for builtin in ["PREROUTING", "INPUT", "FORWARD", "OUTPUT", "POSTROUTING"] {
        run_best_effort(program, &["-w", "-t", "mangle", "-D", builtin, "-j", CHAIN]);
    }
    run_best_effort(program, &["-w", "-t", "mangle", "-X", CHAIN_RULES]);
    run_best_effort(program, &["-w", "-t", "mangle", "-X", CHAIN]);
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
    setup_common("iptables", IPV4_LOCAL_RANGES, cfg)
}

pub fn cleanup_v4() {
    cleanup_common("iptables");
}

pub fn setup_v6(cfg: &EngineConfig) -> RulesResult<()> {
    setup_common("ip6tables", IPV6_LOCAL_RANGES, cfg)
}

pub fn cleanup_v6() {
    cleanup_common("ip6tables");
}
