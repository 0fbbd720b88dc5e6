//! Launcher: splits a command line and starts it with merged output.
//!
//! Process creation is serialized through a lock owned by the launcher.
//! Clones share the same lock, and [`Launcher::with_lock`] lets a host share
//! one lock between independently configured launchers.
//!
//! Exec-style, no shell: the command line is split on ASCII whitespace, the
//! first token is the program, the rest are its arguments. Quoting is not
//! supported, so an argument can never contain a space.

use std::io::PipeReader;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::ExecError;
use crate::session::{ProcessSession, SessionTiming};

/// Starts commands and hands back live [`ProcessSession`]s.
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    lock: Arc<Mutex<()>>,
    timing: SessionTiming,
}

impl Launcher {
    pub fn new(timing: SessionTiming) -> Self {
        Self {
            lock: Arc::new(Mutex::new(())),
            timing,
        }
    }

    /// Build a launcher that serializes creation through an existing lock.
    pub fn with_lock(lock: Arc<Mutex<()>>, timing: SessionTiming) -> Self {
        Self { lock, timing }
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    /// The lock held around process creation.
    pub fn launch_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }

    /// Start `command_line` and return its session.
    ///
    /// The child's stderr is merged into its stdout. The launch lock is held
    /// for the spawn plus the settle delay only; draining and teardown run
    /// without it. The settle delay is taken whether or not the spawn
    /// succeeded. On failure no session exists and no pipe handle survives.
    ///
    /// Fails with [`ExecError::InvalidConfig`] when the launcher's timing has
    /// a zero poll interval.
    pub fn launch(
        &self,
        timeout: Duration,
        command_line: &str,
    ) -> Result<ProcessSession, ExecError> {
        self.timing.validate()?;

        let tokens = split_command_line(command_line);
        let Some((program, args)) = tokens.split_first() else {
            return Err(ExecError::EmptyCommand);
        };

        let (child, output) = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            let spawned = spawn_merged(program, args);
            thread::sleep(self.timing.launch_settle);
            spawned?
        };

        let pid = child.id();
        info!(
            pid,
            command = %command_line,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "process launched"
        );

        ProcessSession::start(
            child,
            output,
            command_line.to_owned(),
            timeout,
            self.timing,
        )
        .map_err(|source| ExecError::Launch {
            program: (*program).to_owned(),
            source,
        })
    }
}

/// Split on runs of ASCII whitespace. No quoting, no escapes.
pub fn split_command_line(command_line: &str) -> Vec<&str> {
    command_line.split_ascii_whitespace().collect()
}

/// Spawn `program` with stdout and stderr both writing into one pipe.
fn spawn_merged(program: &str, args: &[&str]) -> Result<(Child, PipeReader), ExecError> {
    let (reader, writer) = std::io::pipe().map_err(|source| pipe_error(program, source))?;
    let err_writer = writer
        .try_clone()
        .map_err(|source| pipe_error(program, source))?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(writer)
        .stderr(err_writer);

    debug!(program, ?args, "spawning process");
    let child = command.spawn().map_err(|source| ExecError::Launch {
        program: program.to_owned(),
        source,
    })?;

    // The command still owns the parent's copies of the write end; the
    // reader only sees end-of-stream once they are gone.
    drop(command);

    Ok((child, reader))
}

fn pipe_error(program: &str, source: std::io::Error) -> ExecError {
    ExecError::PipeSetup {
        program: program.to_owned(),
        source,
    }
}
