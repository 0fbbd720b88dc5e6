use std::path::PathBuf;

/// Errors surfaced to callers of the launcher and to the host binary.
///
/// Everything that can go wrong after a session exists (read failures,
/// close failures, kill failures) is contained inside the drain worker and
/// logged; only launch and configuration problems show up here.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Command line is empty.")]
    EmptyCommand,

    #[error("Failed to start '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set up output pipe for '{program}': {source}")]
    PipeSetup {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse environment variable '{var}': {detail}")]
    ConfigEnvParse { var: String, detail: String },

    #[error("Invalid configuration: {field} {detail}")]
    InvalidConfig { field: &'static str, detail: String },

    #[error("Failed to write session report {path}: {detail}")]
    ReportWriteFailed { path: PathBuf, detail: String },
}

impl ExecError {
    /// True for the launch-failure family: no session was created.
    pub fn is_launch_error(&self) -> bool {
        matches!(
            self,
            ExecError::EmptyCommand | ExecError::Launch { .. } | ExecError::PipeSetup { .. }
        )
    }
}
