//! Run an external command, capture its merged stdout/stderr line by line on
//! a background thread, check a caller-owned timeout without blocking, and
//! always release the process and its pipes however it ends.
//!
//! ```no_run
//! use std::time::Duration;
//! use cmdexec::Launcher;
//!
//! let launcher = Launcher::default();
//! let session = launcher.launch(Duration::from_secs(5), "echo hello")?;
//! while !session.is_done() {
//!     if session.is_timed_out() {
//!         session.terminate();
//!     }
//!     std::thread::sleep(Duration::from_millis(50));
//! }
//! assert_eq!(session.wait_result().as_deref(), Some("hello\n"));
//! # Ok::<(), cmdexec::ExecError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod report;
pub mod session;
pub mod terminate;

pub use error::ExecError;
pub use launcher::Launcher;
pub use report::SessionReport;
pub use session::{ProcessSession, SessionTiming};
pub use terminate::Termination;
