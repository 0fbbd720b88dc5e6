use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cli::RunArgs;
use crate::error::ExecError;
use crate::session::SessionTiming;

// Precedence: CLI > env > file > defaults.

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_RESULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_LAUNCH_SETTLE_MS: u64 = 10;
const DEFAULT_EXIT_DRAIN_GRACE_MS: u64 = 2_000;

const ENV_PREFIX: &str = "CMDEXEC_";

/// Resolved configuration for one `cmdexec run`.
///
/// Built from three layers with precedence CLI > env > file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    pub timeout_ms: u64,
    /// Terminate the process when the timeout is reached instead of only
    /// reporting it.
    pub kill_on_timeout: bool,
    pub poll_interval_ms: u64,
    pub result_poll_interval_ms: u64,
    pub launch_settle_ms: u64,
    /// Upper bound on waiting for end of output once the process has exited.
    pub exit_drain_grace_ms: u64,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
    /// When set, the session report is also written here as JSON.
    pub report_path: Option<PathBuf>,
}

/// TOML-deserializable config file representation. All fields optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    timeout_ms: Option<u64>,
    kill_on_timeout: Option<bool>,
    poll_interval_ms: Option<u64>,
    result_poll_interval_ms: Option<u64>,
    launch_settle_ms: Option<u64>,
    exit_drain_grace_ms: Option<u64>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

/// Intermediate layer where every field is optional, used to merge sources.
#[derive(Debug, Default)]
struct ConfigLayer {
    timeout_ms: Option<u64>,
    kill_on_timeout: Option<bool>,
    poll_interval_ms: Option<u64>,
    result_poll_interval_ms: Option<u64>,
    launch_settle_ms: Option<u64>,
    exit_drain_grace_ms: Option<u64>,
    log_level: Option<String>,
    log_file: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl ExecConfig {
    /// Load configuration with precedence: CLI > env > file > defaults.
    pub fn load(config_path: Option<&Path>, cli_args: &RunArgs) -> anyhow::Result<Self> {
        Self::load_with_env(config_path, cli_args, real_env_var)
    }

    /// Reject values that would turn a polling loop into a busy spin.
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.poll_interval_ms == 0 {
            return Err(ExecError::InvalidConfig {
                field: "poll_interval_ms",
                detail: "must be greater than 0".to_owned(),
            });
        }
        if self.result_poll_interval_ms == 0 {
            return Err(ExecError::InvalidConfig {
                field: "result_poll_interval_ms",
                detail: "must be greater than 0".to_owned(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Session polling intervals derived from this config.
    pub fn timing(&self) -> SessionTiming {
        SessionTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            result_poll_interval: Duration::from_millis(self.result_poll_interval_ms),
            launch_settle: Duration::from_millis(self.launch_settle_ms),
            exit_drain_grace: Duration::from_millis(self.exit_drain_grace_ms),
        }
    }

    /// Internal constructor that accepts an env-var lookup function,
    /// enabling deterministic testing without process-global mutation.
    fn load_with_env(
        config_path: Option<&Path>,
        cli_args: &RunArgs,
        env_fn: fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let file_layer = match config_path {
            Some(path) => load_file_layer(path)?,
            None => ConfigLayer::default(),
        };
        let env_layer = load_env_layer(env_fn)?;
        let cli_layer = cli_layer_from(cli_args);

        let merged = merge_layers(file_layer, env_layer, cli_layer);

        Ok(ExecConfig {
            timeout_ms: merged.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            kill_on_timeout: merged.kill_on_timeout.unwrap_or(false),
            poll_interval_ms: merged.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            result_poll_interval_ms: merged
                .result_poll_interval_ms
                .unwrap_or(DEFAULT_RESULT_POLL_INTERVAL_MS),
            launch_settle_ms: merged.launch_settle_ms.unwrap_or(DEFAULT_LAUNCH_SETTLE_MS),
            exit_drain_grace_ms: merged
                .exit_drain_grace_ms
                .unwrap_or(DEFAULT_EXIT_DRAIN_GRACE_MS),
            log_level: merged.log_level,
            log_file: merged.log_file,
            report_path: merged.report_path,
        })
    }
}

fn load_file_layer(path: &Path) -> anyhow::Result<ConfigLayer> {
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    let fc: FileConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
    Ok(ConfigLayer {
        timeout_ms: fc.timeout_ms,
        kill_on_timeout: fc.kill_on_timeout,
        poll_interval_ms: fc.poll_interval_ms,
        result_poll_interval_ms: fc.result_poll_interval_ms,
        launch_settle_ms: fc.launch_settle_ms,
        exit_drain_grace_ms: fc.exit_drain_grace_ms,
        log_level: fc.log_level,
        log_file: fc.log_file,
        report_path: fc.report_path,
    })
}

fn real_env_var(suffix: &str) -> Option<String> {
    let key = format!("{ENV_PREFIX}{suffix}");
    env::var(&key).ok().filter(|v| !v.is_empty())
}

fn load_env_layer(env_fn: fn(&str) -> Option<String>) -> Result<ConfigLayer, ExecError> {
    Ok(ConfigLayer {
        timeout_ms: parse_env_u64(env_fn, "TIMEOUT_MS")?,
        kill_on_timeout: parse_env_bool(env_fn, "KILL_ON_TIMEOUT")?,
        poll_interval_ms: parse_env_u64(env_fn, "POLL_INTERVAL_MS")?,
        result_poll_interval_ms: parse_env_u64(env_fn, "RESULT_POLL_INTERVAL_MS")?,
        launch_settle_ms: parse_env_u64(env_fn, "LAUNCH_SETTLE_MS")?,
        exit_drain_grace_ms: parse_env_u64(env_fn, "EXIT_DRAIN_GRACE_MS")?,
        log_level: env_fn("LOG_LEVEL"),
        log_file: env_fn("LOG_FILE").map(PathBuf::from),
        report_path: env_fn("REPORT_PATH").map(PathBuf::from),
    })
}

fn parse_env_u64(
    env_fn: fn(&str) -> Option<String>,
    suffix: &str,
) -> Result<Option<u64>, ExecError> {
    match env_fn(suffix) {
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ExecError::ConfigEnvParse {
                var: format!("{ENV_PREFIX}{suffix}"),
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn parse_env_bool(
    env_fn: fn(&str) -> Option<String>,
    suffix: &str,
) -> Result<Option<bool>, ExecError> {
    match env_fn(suffix) {
        Some(s) => s
            .parse::<bool>()
            .map(Some)
            .map_err(|e| ExecError::ConfigEnvParse {
                var: format!("{ENV_PREFIX}{suffix}"),
                detail: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn cli_layer_from(args: &RunArgs) -> ConfigLayer {
    ConfigLayer {
        timeout_ms: args.timeout_ms,
        kill_on_timeout: if args.kill_on_timeout { Some(true) } else { None },
        poll_interval_ms: args.poll_interval_ms,
        result_poll_interval_ms: args.result_poll_interval_ms,
        launch_settle_ms: args.launch_settle_ms,
        exit_drain_grace_ms: args.exit_drain_grace_ms,
        log_level: args.log_level.clone(),
        log_file: args.log_file.clone(),
        report_path: args.report_path.clone(),
    }
}

/// Merge three layers. For each field, pick CLI first, then env, then file.
fn merge_layers(file: ConfigLayer, env: ConfigLayer, cli: ConfigLayer) -> ConfigLayer {
    ConfigLayer {
        timeout_ms: cli.timeout_ms.or(env.timeout_ms).or(file.timeout_ms),
        kill_on_timeout: cli
            .kill_on_timeout
            .or(env.kill_on_timeout)
            .or(file.kill_on_timeout),
        poll_interval_ms: cli
            .poll_interval_ms
            .or(env.poll_interval_ms)
            .or(file.poll_interval_ms),
        result_poll_interval_ms: cli
            .result_poll_interval_ms
            .or(env.result_poll_interval_ms)
            .or(file.result_poll_interval_ms),
        launch_settle_ms: cli
            .launch_settle_ms
            .or(env.launch_settle_ms)
            .or(file.launch_settle_ms),
        exit_drain_grace_ms: cli
            .exit_drain_grace_ms
            .or(env.exit_drain_grace_ms)
            .or(file.exit_drain_grace_ms),
        log_level: cli.log_level.or(env.log_level).or(file.log_level),
        log_file: cli.log_file.or(env.log_file).or(file.log_file),
        report_path: cli.report_path.or(env.report_path).or(file.report_path),
    }
}
