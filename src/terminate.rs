//! Best-effort forceful termination of a child process.
//!
//! Termination is advisory cleanup: the process may already have exited on
//! its own, so nothing here ever returns an error. The outcome is reported
//! as a [`Termination`] value and failures are logged.
//!
//! **Unix:** the process id is queryable, so the primary path sends SIGKILL
//! by id via `nix`. **Elsewhere:** there is no kill-by-id capability and the
//! handle's own `kill` is used directly.

use std::io;
use std::process::Child;

use tracing::{debug, warn};

/// What a call to [`destroy`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process had already been observed as exited; nothing was sent.
    AlreadyExited,
    /// SIGKILL was delivered by process id.
    KilledById,
    /// Kill by id was unavailable or failed; the handle's `kill` succeeded.
    Destroyed,
    /// Both paths failed.
    Failed,
}

/// Forcefully terminate `child` unless it has already exited.
///
/// The exit check runs first so that a reaped process id (which the OS may
/// have recycled) is never signalled.
pub fn destroy(child: &mut Child) -> Termination {
    destroy_with(child, kill_by_id)
}

/// [`destroy`] with the kill-by-id step supplied by the caller.
pub(crate) fn destroy_with<F>(child: &mut Child, kill_by_id: F) -> Termination
where
    F: FnOnce(u32) -> io::Result<()>,
{
    let pid = child.id();

    match child.try_wait() {
        Ok(Some(_)) => {
            debug!(pid, "process already exited, nothing to terminate");
            return Termination::AlreadyExited;
        }
        Ok(None) => {}
        Err(e) => debug!(pid, err = %e, "exit check before terminate failed"),
    }

    force_kill(child, kill_by_id)
}

/// Kill by id, falling back to the handle. No exit check.
fn force_kill<F>(child: &mut Child, kill_by_id: F) -> Termination
where
    F: FnOnce(u32) -> io::Result<()>,
{
    let pid = child.id();

    match kill_by_id(pid) {
        Ok(()) => {
            debug!(pid, "sent kill by process id");
            return Termination::KilledById;
        }
        Err(e) => debug!(pid, err = %e, "kill by process id failed, falling back to handle kill"),
    }

    match child.kill() {
        Ok(()) => {
            debug!(pid, "terminated process through its handle");
            Termination::Destroyed
        }
        Err(e) => {
            warn!(pid, err = %e, "failed to terminate process");
            Termination::Failed
        }
    }
}

#[cfg(unix)]
fn kill_by_id(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    kill(Pid::from_raw(raw), Signal::SIGKILL).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn kill_by_id(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "kill by process id is not available on this platform",
    ))
}
