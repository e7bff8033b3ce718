//! Logging setup (spec.md §4.10 / SPEC_FULL.md §4.10): a `-v` count
//! maps to info/debug/trace, `--silent` drops to warn-and-above to
//! suppress the per-packet state-mnemonic lines, and `--log-file`
//! redirects output to a file instead of stderr.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber. Must be called once,
/// before any other component logs.
pub fn init(verbose: u8, silent: bool, log_file: Option<&str>) -> Result<()> {
    let level = if silent {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = fmt().with_env_filter(filter).with_target(false).compact();

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.init(),
    }

    Ok(())
}
