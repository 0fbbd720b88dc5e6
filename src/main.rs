use std::process::ExitCode;
use std::thread;

use clap::Parser;
use tracing::{error, info, warn};

use cmdexec::cli::{Cli, Commands};
use cmdexec::config::ExecConfig;
use cmdexec::report::write_report;
use cmdexec::{Launcher, ProcessSession};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command exited 0 without being terminated.
fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run(args) => {
            let config = ExecConfig::load(args.config.as_deref(), &args)?;

            cmdexec::logging::init(config.log_level.as_deref(), config.log_file.as_deref())?;

            config.validate()?;

            let command_line = args.command_line();
            info!(
                command = %command_line,
                timeout_ms = config.timeout_ms,
                kill_on_timeout = config.kill_on_timeout,
                "config loaded"
            );

            let launcher = Launcher::new(config.timing());
            let session = launcher.launch(config.timeout(), &command_line)?;

            supervise(&session, &config);

            let report = session.report();
            if let Some(path) = &config.report_path {
                if let Err(e) = write_report(&report, path) {
                    warn!(err = %e, "failed to write session report");
                }
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &report.output {
                    Some(text) => print!("{text}"),
                    None => info!(pid = report.pid, "no output"),
                }
            }

            Ok(report.success())
        }
    }
}

/// Watch the session until it is done, acting on the timeout as configured.
fn supervise(session: &ProcessSession, config: &ExecConfig) {
    let poll = config.timing().poll_interval;
    let mut warned = false;

    while !session.is_done() {
        if session.is_timed_out() {
            if config.kill_on_timeout {
                warn!(
                    pid = session.pid(),
                    timeout_ms = config.timeout_ms,
                    "timeout reached, terminating process"
                );
                session.terminate();
                return;
            }
            if !warned {
                warn!(
                    pid = session.pid(),
                    timeout_ms = config.timeout_ms,
                    "timeout reached, still waiting for process to exit"
                );
                warned = true;
            }
        }
        thread::sleep(poll);
    }
}
