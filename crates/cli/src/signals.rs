//! Signal handling and `--kill-running`, grounded in
//! `original_source/src/signals.c` (spec.md §4.11 / SPEC_FULL.md §4.11).

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use tracing::warn;

/// Set once by the `SIGINT`/`SIGTERM` handler; observed by the queue
/// loop's `should_exit` closure between `recv` calls (spec.md §5).
static EXIT_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_exit_signal(_sig: libc::c_int) {
    EXIT_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install the signal dispositions this process runs with: `SIGPIPE`
/// and `SIGHUP` ignored, `SIGINT`/`SIGTERM` set the cooperative exit
/// flag. Mirrors `fh_signal_setup`.
pub fn install() -> Result<()> {
    unsafe {
        if libc::signal(libc::SIGPIPE, libc::SIG_IGN) == libc::SIG_ERR {
            bail!("sigaction(SIGPIPE): {}", std::io::Error::last_os_error());
        }
        if libc::signal(libc::SIGHUP, libc::SIG_IGN) == libc::SIG_ERR {
            bail!("sigaction(SIGHUP): {}", std::io::Error::last_os_error());
        }
        if libc::signal(libc::SIGINT, handle_exit_signal as libc::sighandler_t) == libc::SIG_ERR {
            bail!("sigaction(SIGINT): {}", std::io::Error::last_os_error());
        }
        if libc::signal(libc::SIGTERM, handle_exit_signal as libc::sighandler_t) == libc::SIG_ERR {
            bail!("sigaction(SIGTERM): {}", std::io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Whether `SIGINT`/`SIGTERM` has been received since [`install`].
#[must_use]
pub fn exit_requested() -> bool {
    EXIT_REQUESTED.load(Ordering::SeqCst)
}

/// Scan `/proc` for another live process sharing this binary's
/// `/proc/self/exe` target and send it `SIGTERM`. Mirrors
/// `fh_kill_running`. Returns an error if no matching process was
/// found, or if signaling a matched process failed.
pub fn kill_running() -> Result<()> {
    let self_path = fs::read_link("/proc/self/exe").context("readlink /proc/self/exe")?;
    let self_pid = std::process::id();

    let mut matched = false;
    let mut had_error = false;

    for entry in fs::read_dir("/proc").context("opendir /proc")?.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Ok(pid) = name.parse::<u32>() else { continue };
        if pid <= 1 || pid == self_pid {
            continue;
        }

        let exe_path = PathBuf::from(format!("/proc/{pid}/exe"));
        let Ok(target) = fs::read_link(&exe_path) else { continue };
        if target != self_path {
            continue;
        }

        matched = true;
        let res = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if res < 0 {
            warn!(pid, error = %std::io::Error::last_os_error(), "failed to signal running instance");
            had_error = true;
        }
    }

    if matched && !had_error {
        Ok(())
    } else {
        bail!("no running instance found, or failed to signal it")
    }
}
