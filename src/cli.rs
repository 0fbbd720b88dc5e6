use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cmdexec — run a command, capture its output, never hang forever.
///
/// Launches a command with stdout and stderr merged, waits for it while
/// checking a timeout, and prints the captured text.
#[derive(Debug, Parser)]
#[command(name = "cmdexec", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one command line and print its combined output.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
///
/// Every option except the command can also come from a config file or
/// `CMDEXEC_*` env vars. Precedence: CLI > env > file.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Timeout in milliseconds (default: 30000).
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Terminate the process once the timeout is reached.
    #[arg(long, default_value_t = false)]
    pub kill_on_timeout: bool,

    /// Exit poll interval of the drain worker in milliseconds (default: 50).
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Result wait poll interval in milliseconds (default: 500).
    #[arg(long)]
    pub result_poll_interval_ms: Option<u64>,

    /// Delay after spawn while holding the launch lock (default: 10).
    #[arg(long)]
    pub launch_settle_ms: Option<u64>,

    /// How long to wait for end of output after exit (default: 2000).
    #[arg(long)]
    pub exit_drain_grace_ms: Option<u64>,

    /// Print the session report as JSON instead of the raw output.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write the session report as JSON to this file.
    #[arg(long)]
    pub report_path: Option<PathBuf>,

    /// Log level filter (default: "info"). Supports tracing directives
    /// (e.g. "debug", "cmdexec=trace,warn"). Overridden by CMDEXEC_LOG.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to a log file. When set, structured JSON logs are appended here
    /// in addition to the human-readable stderr output.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// The command and its arguments. Joined with single spaces and split
    /// again on whitespace; no quoting.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl RunArgs {
    /// The command words joined into one command line.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}
