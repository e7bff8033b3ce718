//! Child-process runner for the rule collaborator. Grounded on
//! `original_source/src/process.c`'s `fh_execute_command`: spawn,
//! optionally silence its output, wait for exit.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{RulesError, RulesResult};

/// Run `program` with `args`. When `silent` is true, stdout/stderr are
/// discarded rather than inherited — used for probe commands and
/// best-effort optional rules whose failure isn't fatal.
pub fn run(program: &'static str, args: &[&str], silent: bool) -> RulesResult<()> {
    debug!(program, ?args, "executing rule command");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if silent {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = cmd.status().map_err(|source| RulesError::Spawn { program, source })?;

    if !status.success() {
        let code = status.code().unwrap_or(-1);
        if !silent {
            warn!(program, ?args, code, "rule command exited non-zero");
        }
        return Err(RulesError::NonZeroExit { program, status: code });
    }

    Ok(())
}

/// Run `program` with `args`, swallowing any failure. Used for cleanup
/// commands that may legitimately fail (e.g. deleting a rule that was
/// never installed).
pub fn run_best_effort(program: &'static str, args: &[&str]) {
    let _ = run(program, args, true);
}

/// Probe whether the `nft` binary is present and working.
#[must_use]
pub fn nft_is_working() -> bool {
    run("nft", &["--version"], true).is_ok()
}
