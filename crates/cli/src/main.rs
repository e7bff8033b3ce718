mod args;
mod logging;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use daemonize::Daemonize;
use tracing::{error, info};

use args::Cli;
use feint_engine::{InjectionEngine, RawEmitter};
use feint_queue::QueueReader;
use feint_rules::RuleInstaller;

fn main() {
    let cli = Cli::parse();

    if cli.kill_running {
        if let Err(e) = signals::kill_running() {
            eprintln!("feintd: {e}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = run(cli) {
        eprintln!("feintd: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let daemon = cli.daemon;
    let verbose = cli.verbose;
    let silent = cli.silent;
    let log_file = cli.log_file.clone();

    let cfg = cli
        .into_engine_config()
        .context("invalid configuration")?;

    if daemon {
        Daemonize::new()
            .start()
            .context("failed to daemonize")?;
    }

    logging::init(verbose, silent, log_file.as_deref()).context("failed to set up logging")?;

    info!("feintd starting, netfilter queue number {}", cfg.queue_num);

    signals::install().context("failed to install signal handlers")?;

    let installer = RuleInstaller::new(&cfg);
    installer
        .setup(&cfg)
        .context("failed to install firewall rules")?;

    let result = run_engine(&cfg, &installer);

    installer.cleanup(&cfg);

    match &result {
        Ok(()) => info!("exiting normally"),
        Err(e) => error!(error = %e, "engine loop exited with an error"),
    }

    result
}

fn run_engine(cfg: &feint_common::EngineConfig, installer: &RuleInstaller) -> Result<()> {
    let emitter = RawEmitter::new(cfg.fwmark).context("failed to open link-layer sender")?;
    let engine = InjectionEngine::new(cfg.clone(), emitter, installer.is_iptables_mode())
        .context("failed to build injection engine")?;

    let mut queue = QueueReader::setup(cfg.queue_num).context("failed to set up netfilter queue")?;

    info!(queue_num = cfg.queue_num, "listening for traffic");

    queue
        .run(engine, signals::exit_requested)
        .context("netfilter queue loop failed")?;

    Ok(())
}
