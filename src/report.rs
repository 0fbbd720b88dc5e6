//! Session report: a JSON-serializable summary of one finished session.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::ExecError;

/// Summary of a finished session, produced by `ProcessSession::report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// The command line as given to the launcher.
    pub command: String,
    pub pid: u32,
    /// Captured text; omitted when the process produced no output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// True when the session ran for at least its timeout.
    pub timed_out: bool,
    /// True when the host terminated the process itself.
    pub terminated_by_caller: bool,
    /// RFC 3339 launch time.
    pub started_at: String,
    pub duration_ms: u64,
}

impl SessionReport {
    /// Exited with code 0 without being terminated.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.terminated_by_caller
    }
}

/// Write `report` as pretty JSON to `path`, creating parent directories.
///
/// Writes to a temp file first and renames it into place; if the rename
/// fails, falls back to a direct write.
pub fn write_report(report: &SessionReport, path: &Path) -> Result<(), ExecError> {
    let fail = |detail: String| ExecError::ReportWriteFailed {
        path: path.to_path_buf(),
        detail,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| fail(format!("failed to create parent directory: {e}")))?;
        }
    }

    let json = serde_json::to_string_pretty(report)
        .map_err(|e| fail(format!("failed to serialize report: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    if let Err(e) = (|| -> std::io::Result<()> {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        Ok(())
    })() {
        let _ = fs::remove_file(&tmp_path);
        return Err(fail(format!("failed to write temp file: {e}")));
    }

    if fs::rename(&tmp_path, path).is_err() {
        let _ = fs::remove_file(&tmp_path);
        fs::write(path, &json).map_err(|e| fail(e.to_string()))?;
    }
    Ok(())
}
