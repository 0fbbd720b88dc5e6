//! A launched command: the live child, its background drain worker, and the
//! caller-facing timeout / result / terminate operations.
//!
//! The drain worker is the only writer of the output buffer. It polls the
//! child for exit, moves whatever complete lines the line pump has read into
//! the buffer, and once the child has exited it drains the rest, closes the
//! streams, terminates the child and publishes `done`. Callers only read the
//! buffer after observing `done`.
//!
//! Two detached threads run per session:
//! - the line pump, which blocks on the merged output pipe and forwards
//!   decoded lines over a channel, then discards any unread raw bytes;
//! - the drain worker described above.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::ExecError;
use crate::report::SessionReport;
use crate::terminate::{self, Termination};

/// Sleep between exit polls in the drain worker.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Sleep between `done` checks in [`ProcessSession::wait_result`].
pub const DEFAULT_RESULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Pause after a successful spawn, taken while still holding the launch lock.
pub const DEFAULT_LAUNCH_SETTLE: Duration = Duration::from_millis(10);

/// How long the worker waits for end-of-stream once the child has exited.
pub const DEFAULT_EXIT_DRAIN_GRACE: Duration = Duration::from_millis(2000);

/// Read buffer and discard scratch size for the output pipe.
const SCRATCH_LEN: usize = 128;

/// Polling and grace intervals shared by every session a launcher creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub result_poll_interval: Duration,
    pub launch_settle: Duration,
    pub exit_drain_grace: Duration,
}

impl SessionTiming {
    /// Reject intervals that would turn the polling loops into busy spins.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.poll_interval.is_zero() {
            return Err(ExecError::InvalidConfig {
                field: "poll_interval",
                detail: "must be greater than 0".to_owned(),
            });
        }
        if self.result_poll_interval.is_zero() {
            return Err(ExecError::InvalidConfig {
                field: "result_poll_interval",
                detail: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            result_poll_interval: DEFAULT_RESULT_POLL_INTERVAL,
            launch_settle: DEFAULT_LAUNCH_SETTLE,
            exit_drain_grace: DEFAULT_EXIT_DRAIN_GRACE,
        }
    }
}

/// Recorded by the worker right before it publishes `done`.
#[derive(Debug, Clone, Copy)]
struct Finish {
    exit_code: Option<i32>,
    duration: Duration,
}

#[derive(Default)]
struct Shared {
    output: Mutex<String>,
    finish: Mutex<Option<Finish>>,
    done: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to one launched command.
///
/// Dropping the session does not stop the drain worker; it keeps running
/// until the child exits and then releases every resource on its own.
///
/// One exception: when a descendant of the child still holds the output
/// pipe after the child has exited, teardown gives up on it once the exit
/// drain grace runs out. The reader thread is then left detached and the
/// read side of the pipe is only closed when that descendant lets go, after
/// the session is already done.
pub struct ProcessSession {
    command_line: String,
    pid: u32,
    child: Arc<Mutex<Child>>,
    shared: Arc<Shared>,
    started: Instant,
    started_at: DateTime<Utc>,
    timeout: Duration,
    result_poll_interval: Duration,
    terminated_by_caller: AtomicBool,
}

impl std::fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSession")
            .field("command_line", &self.command_line)
            .field("pid", &self.pid)
            .field("timeout", &self.timeout)
            .field("done", &self.is_done())
            .finish()
    }
}

impl ProcessSession {
    /// Wrap a freshly spawned child and start its line pump and drain worker.
    ///
    /// `output` is the read side of the pipe that carries both stdout and
    /// stderr. If a background thread cannot be started the child is killed
    /// and reaped before the error is returned.
    pub(crate) fn start<R>(
        mut child: Child,
        output: R,
        command_line: String,
        timeout: Duration,
        timing: SessionTiming,
    ) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let pid = child.id();
        let started = Instant::now();
        let started_at = Utc::now();
        let stdin = child.stdin.take();

        let (tx, rx) = mpsc::channel();
        let pump = match thread::Builder::new()
            .name(format!("cmdexec-pump-{pid}"))
            .spawn(move || pump_lines(output, tx, pid))
        {
            Ok(handle) => handle,
            Err(e) => {
                abandon_child(&mut child);
                return Err(e);
            }
        };

        let child = Arc::new(Mutex::new(child));
        let shared = Arc::new(Shared::default());

        let worker = DrainWorker {
            pid,
            child: Arc::clone(&child),
            shared: Arc::clone(&shared),
            stdin,
            lines: rx,
            pump: Some(pump),
            timing,
            started,
        };
        // Detached: completion is observed through `done`, never by joining.
        if let Err(e) = thread::Builder::new()
            .name(format!("cmdexec-drain-{pid}"))
            .spawn(move || worker.run())
        {
            abandon_child(&mut lock(&child));
            return Err(e);
        }

        Ok(Self {
            command_line,
            pid,
            child,
            shared,
            started,
            started_at,
            timeout,
            result_poll_interval: timing.result_poll_interval,
            terminated_by_caller: AtomicBool::new(false),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once the elapsed time since launch has reached the timeout.
    ///
    /// Advisory only: nothing is cancelled or killed. Uses a monotonic clock,
    /// so once it returns true it keeps returning true.
    pub fn is_timed_out(&self) -> bool {
        self.started.elapsed() >= self.timeout
    }

    /// True once the drain worker has finished teardown.
    pub fn is_done(&self) -> bool {
        self.shared.done.load(Ordering::Acquire)
    }

    /// Block until the session is done, then return the captured text.
    ///
    /// Returns `None` when the process produced no output. The wait is a
    /// sleep-and-recheck loop and cannot be cancelled; a caller that gives up
    /// has to abandon the calling thread.
    ///
    /// Output a lingering descendant writes after the exit drain grace is
    /// not part of the result; see [`ProcessSession`].
    pub fn wait_result(&self) -> Option<String> {
        while !self.is_done() {
            thread::sleep(self.result_poll_interval);
        }

        let output = lock(&self.shared.output);
        if output.is_empty() {
            None
        } else {
            Some(output.clone())
        }
    }

    /// Exit code of the process, available once the session is done.
    ///
    /// `None` while running, when the process was killed by a signal, or
    /// when the exit status could not be observed.
    pub fn exit_code(&self) -> Option<i32> {
        if !self.is_done() {
            return None;
        }
        let finish = *lock(&self.shared.finish);
        finish.and_then(|f| f.exit_code)
    }

    /// Forcefully terminate the process. Safe to call at any time and any
    /// number of times; never fails.
    pub fn terminate(&self) -> Termination {
        let outcome = terminate::destroy(&mut lock(&self.child));
        if matches!(outcome, Termination::KilledById | Termination::Destroyed) {
            self.terminated_by_caller.store(true, Ordering::Release);
            info!(pid = self.pid, command = %self.command_line, "process terminated by caller");
        }
        outcome
    }

    /// Block until done and summarize the session.
    pub fn report(&self) -> SessionReport {
        let output = self.wait_result();
        let finish = *lock(&self.shared.finish);
        let duration = finish.map_or_else(|| self.elapsed(), |f| f.duration);

        SessionReport {
            command: self.command_line.clone(),
            pid: self.pid,
            output,
            exit_code: finish.and_then(|f| f.exit_code),
            timed_out: duration >= self.timeout,
            terminated_by_caller: self.terminated_by_caller.load(Ordering::Acquire),
            started_at: self.started_at.to_rfc3339(),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Kill and reap a child whose session could not be set up.
fn abandon_child(child: &mut Child) {
    terminate::destroy(child);
    if let Err(e) = child.wait() {
        warn!(pid = child.id(), err = %e, "failed to reap abandoned process");
    }
}

/// Best-effort reap of a child whose exit was never observed.
fn reap_after_kill(child: &mut Child, termination: Termination, pid: u32) {
    // Without a delivered kill the wait could block indefinitely.
    if termination == Termination::Failed {
        return;
    }
    if let Err(e) = child.wait() {
        warn!(pid, err = %e, "failed to reap process after teardown");
    }
}

struct DrainWorker {
    pid: u32,
    child: Arc<Mutex<Child>>,
    shared: Arc<Shared>,
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    pump: Option<JoinHandle<()>>,
    timing: SessionTiming,
    started: Instant,
}

impl DrainWorker {
    fn run(mut self) {
        let status = self.poll_until_exit();

        self.drain_remaining();
        self.close_streams();
        let termination = terminate::destroy(&mut lock(&self.child));
        if status.is_none() {
            reap_after_kill(&mut lock(&self.child), termination, self.pid);
        }

        let exit_code = status.and_then(|s| s.code());
        let duration = self.started.elapsed();
        let output_bytes = lock(&self.shared.output).len();
        *lock(&self.shared.finish) = Some(Finish {
            exit_code,
            duration,
        });

        info!(
            pid = self.pid,
            exit_code,
            output_bytes,
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            ?termination,
            "process session finished"
        );

        self.shared.done.store(true, Ordering::Release);
    }

    /// Returns the exit status, or `None` when the exit check itself failed.
    fn poll_until_exit(&mut self) -> Option<ExitStatus> {
        loop {
            let polled = lock(&self.child).try_wait();
            match polled {
                Ok(Some(status)) => return Some(status),
                Ok(None) => {
                    self.drain_available();
                    thread::sleep(self.timing.poll_interval);
                }
                Err(e) => {
                    warn!(pid = self.pid, err = %e, "exit check failed, tearing down session");
                    return None;
                }
            }
        }
    }

    fn drain_available(&mut self) {
        let mut output = lock(&self.shared.output);
        while let Ok(line) = self.lines.try_recv() {
            append_line(&mut output, &line);
        }
    }

    /// Collect lines until the pump reports end-of-stream, bounded by the
    /// exit drain grace. A descendant that inherited the pipe can keep it
    /// open indefinitely; in that case the pump is left behind, detached.
    fn drain_remaining(&mut self) {
        let deadline = Instant::now() + self.timing.exit_drain_grace;
        loop {
            let wait = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(wait) {
                Ok(line) => append_line(&mut lock(&self.shared.output), &line),
                Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        pid = self.pid,
                        grace_ms = u64::try_from(self.timing.exit_drain_grace.as_millis())
                            .unwrap_or(u64::MAX),
                        "output pipe still open after exit, abandoning remaining output"
                    );
                    self.pump = None;
                    return;
                }
            }
        }
    }

    /// Each stream is closed independently of the others.
    fn close_streams(&mut self) {
        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                warn!(pid = self.pid, stream = "stdin", err = %e, "failed to close stream");
            }
            drop(stdin);
        }

        // The pump owns the read side and closes it when it returns.
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                warn!(pid = self.pid, stream = "output", "output reader panicked before close");
            }
        }
    }
}

fn append_line(output: &mut String, line: &str) {
    output.push_str(line);
    output.push('\n');
}

/// Forward decoded lines from `reader` until end-of-stream, a read error, or
/// the receiving side going away; then discard whatever raw bytes remain.
fn pump_lines<R: Read>(reader: R, lines: Sender<String>, pid: u32) {
    let mut buffered = BufReader::with_capacity(SCRATCH_LEN, reader);
    let mut raw = Vec::new();

    loop {
        raw.clear();
        match buffered.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                if lines.send(decode_line(&raw)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(pid, err = %e, "failed to read process output");
                // A partial line read before the error is still output.
                if !raw.is_empty() {
                    let _ = lines.send(decode_line(&raw));
                }
                break;
            }
        }
    }

    let mut reader = buffered.into_inner();
    let discarded = discard_remaining(&mut reader, pid);
    if discarded > 0 {
        debug!(pid, discarded, "discarded unread output bytes");
    }
}

/// Read and drop everything left in `reader`, returning the byte count.
fn discard_remaining<R: Read>(reader: &mut R, pid: u32) -> usize {
    let mut scratch = [0u8; SCRATCH_LEN];
    let mut discarded = 0;
    loop {
        match reader.read(&mut scratch) {
            Ok(0) => return discarded,
            Ok(n) => discarded += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(pid, err = %e, "failed to drain process output");
                return discarded;
            }
        }
    }
}

/// Strip one trailing `\n` or `\r\n` and decode lossily.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = if raw.len() != line.len() {
        line.strip_suffix(b"\r").unwrap_or(line)
    } else {
        line
    };
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Launcher;
    use std::io::Cursor;

    fn fast_launcher() -> Launcher {
        Launcher::new(SessionTiming {
            poll_interval: Duration::from_millis(10),
            result_poll_interval: Duration::from_millis(10),
            launch_settle: Duration::from_millis(1),
            exit_drain_grace: Duration::from_secs(2),
        })
    }

    const LONG: Duration = Duration::from_secs(30);

    /// Write `body` to a script and return a command line running it via `sh`.
    #[cfg(unix)]
    fn sh_script(dir: &std::path::Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        format!("sh {}", path.display())
    }

    #[test]
    fn decode_line_strips_newline_variants() {
        assert_eq!(decode_line(b"plain\n"), "plain");
        assert_eq!(decode_line(b"windows\r\n"), "windows");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"lone cr\r"), "lone cr\r");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn decode_line_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{fffd} byte");
    }

    #[test]
    fn pump_forwards_lines_in_order() {
        let (tx, rx) = mpsc::channel();
        pump_lines(Cursor::new(b"one\r\ntwo\nthree".to_vec()), tx, 0);

        let got: Vec<String> = rx.iter().collect();
        assert_eq!(got, vec!["one", "two", "three"]);
    }

    /// Replays a fixed script of read results, one per call.
    struct ScriptedReader {
        steps: std::collections::VecDeque<std::io::Result<Vec<u8>>>,
        reads: usize,
    }

    impl ScriptedReader {
        fn new(steps: Vec<std::io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
                reads: 0,
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len());
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
            }
        }
    }

    #[test]
    fn pump_retries_interrupted_reads_and_stops_on_error() {
        let reader = ScriptedReader::new(vec![
            Err(ErrorKind::Interrupted.into()),
            Ok(b"ok\n".to_vec()),
            Ok(b"part".to_vec()),
            Err(std::io::Error::other("boom")),
            Ok(b"never\n".to_vec()),
        ]);
        let (tx, rx) = mpsc::channel();

        pump_lines(reader, tx, 0);

        let got: Vec<String> = rx.iter().collect();
        assert_eq!(got, vec!["ok", "part"]);
    }

    #[test]
    fn discard_stops_at_read_error() {
        let mut reader = ScriptedReader::new(vec![
            Ok(vec![b'x'; 10]),
            Err(ErrorKind::Interrupted.into()),
            Ok(vec![b'y'; 5]),
            Err(std::io::Error::other("gone")),
            Ok(vec![b'z'; 3]),
        ]);

        assert_eq!(discard_remaining(&mut reader, 0), 15);
        assert_eq!(reader.reads, 4);
    }

    #[test]
    fn reap_after_kill_collects_killed_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .stdin(std::process::Stdio::null())
            .spawn()
            .unwrap();
        let termination = terminate::destroy(&mut child);
        assert_ne!(termination, Termination::Failed);

        let pid = child.id();
        reap_after_kill(&mut child, termination, pid);

        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn timing_rejects_zero_poll_intervals() {
        assert!(SessionTiming::default().validate().is_ok());

        let busy_worker = SessionTiming {
            poll_interval: Duration::ZERO,
            ..SessionTiming::default()
        };
        assert!(matches!(
            busy_worker.validate(),
            Err(ExecError::InvalidConfig {
                field: "poll_interval",
                ..
            })
        ));

        let busy_wait = SessionTiming {
            result_poll_interval: Duration::ZERO,
            ..SessionTiming::default()
        };
        assert!(matches!(
            busy_wait.validate(),
            Err(ExecError::InvalidConfig {
                field: "result_poll_interval",
                ..
            })
        ));
    }

    #[test]
    fn pump_discards_when_receiver_is_gone() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        // Must return rather than block or panic.
        pump_lines(Cursor::new(b"a\nb\nc\n".to_vec()), tx, 0);
    }

    #[test]
    fn discard_remaining_consumes_everything() {
        let data = vec![b'x'; SCRATCH_LEN * 3 + 7];
        let mut cursor = Cursor::new(data);
        assert_eq!(discard_remaining(&mut cursor, 0), SCRATCH_LEN * 3 + 7);
        assert_eq!(discard_remaining(&mut cursor, 0), 0);
    }

    #[test]
    fn echo_hello_returns_single_line() {
        let session = Launcher::default()
            .launch(Duration::from_millis(5000), "echo hello")
            .unwrap();

        assert_eq!(session.wait_result().as_deref(), Some("hello\n"));
        assert!(session.is_done());
        assert_eq!(session.exit_code(), Some(0));
    }

    #[test]
    fn silent_command_returns_no_output() {
        let session = fast_launcher().launch(LONG, "true").unwrap();

        assert_eq!(session.wait_result(), None);
        assert_eq!(session.exit_code(), Some(0));
    }

    #[test]
    fn records_nonzero_exit_code() {
        let session = fast_launcher().launch(LONG, "false").unwrap();

        assert_eq!(session.wait_result(), None);
        assert_eq!(session.exit_code(), Some(1));
    }

    #[test]
    fn partial_last_line_gets_newline() {
        let session = fast_launcher().launch(LONG, r"printf a\nb\nc").unwrap();

        assert_eq!(session.wait_result().as_deref(), Some("a\nb\nc\n"));
    }

    #[test]
    fn crlf_output_is_normalized() {
        let session = fast_launcher().launch(LONG, r"printf x\r\ny\r\n").unwrap();

        assert_eq!(session.wait_result().as_deref(), Some("x\ny\n"));
    }

    #[test]
    fn large_output_is_captured_without_truncation() {
        let session = fast_launcher().launch(LONG, "seq 1 5000").unwrap();

        let output = session.wait_result().unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5000);
        assert_eq!(lines.first(), Some(&"1"));
        assert_eq!(lines.last(), Some(&"5000"));
        assert!(output.ends_with("5000\n"));
    }

    #[cfg(unix)]
    #[test]
    fn stderr_is_merged_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let command = sh_script(dir.path(), "mixed.sh", "echo out\necho err 1>&2\necho tail\n");

        let session = fast_launcher().launch(LONG, &command).unwrap();

        assert_eq!(session.wait_result().as_deref(), Some("out\nerr\ntail\n"));
    }

    #[test]
    fn result_is_stable_after_done() {
        let session = fast_launcher().launch(LONG, "echo stable").unwrap();

        let first = session.wait_result();
        let second = session.wait_result();
        assert_eq!(first, second);
        assert!(session.is_done());
    }

    #[test]
    fn terminate_after_natural_exit_changes_nothing() {
        let session = fast_launcher().launch(LONG, "echo done").unwrap();
        let before = session.wait_result();

        assert_eq!(session.terminate(), Termination::AlreadyExited);
        assert_eq!(session.terminate(), Termination::AlreadyExited);
        assert_eq!(session.wait_result(), before);
        assert!(!session.report().terminated_by_caller);
    }

    #[test]
    fn long_command_times_out_before_done_and_terminates() {
        let session = fast_launcher()
            .launch(Duration::from_millis(50), "sleep 30")
            .unwrap();

        thread::sleep(Duration::from_millis(150));
        assert!(session.is_timed_out());
        assert!(!session.is_done());

        let outcome = session.terminate();
        assert!(
            matches!(outcome, Termination::KilledById | Termination::Destroyed),
            "unexpected outcome: {outcome:?}"
        );

        assert_eq!(session.wait_result(), None);
        assert!(session.is_done());
        assert!(session.is_timed_out());

        let report = session.report();
        assert!(report.timed_out);
        assert!(report.terminated_by_caller);
        assert_eq!(report.exit_code, None);
    }

    #[test]
    fn timeout_check_is_consistent_under_repeated_calls() {
        let expired = fast_launcher().launch(Duration::ZERO, "true").unwrap();
        let pending = fast_launcher().launch(LONG, "true").unwrap();

        for _ in 0..50 {
            assert!(expired.is_timed_out());
            assert!(!pending.is_timed_out());
        }
        expired.wait_result();
        pending.wait_result();
    }

    #[cfg(unix)]
    #[test]
    fn orphaned_pipe_does_not_hang_result() {
        let dir = tempfile::tempdir().unwrap();
        let command = sh_script(dir.path(), "orphan.sh", "echo started\nsleep 5 &\n");

        let launcher = Launcher::new(SessionTiming {
            poll_interval: Duration::from_millis(10),
            result_poll_interval: Duration::from_millis(10),
            launch_settle: Duration::from_millis(1),
            exit_drain_grace: Duration::from_millis(200),
        });
        let begin = Instant::now();
        let session = launcher.launch(LONG, &command).unwrap();

        assert_eq!(session.wait_result().as_deref(), Some("started\n"));
        assert!(
            begin.elapsed() < Duration::from_secs(4),
            "result waited on the orphaned pipe: {:?}",
            begin.elapsed()
        );
    }

    #[test]
    fn report_describes_finished_session() {
        let session = fast_launcher().launch(LONG, "echo reported").unwrap();

        let report = session.report();
        assert_eq!(report.command, "echo reported");
        assert_eq!(report.pid, session.pid());
        assert_eq!(report.output.as_deref(), Some("reported\n"));
        assert_eq!(report.exit_code, Some(0));
        assert!(!report.timed_out);
        assert!(!report.terminated_by_caller);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.started_at).is_ok());
    }
}
