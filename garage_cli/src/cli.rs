//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "garage", version, about = "Garage door position estimator")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/garage.toml")]
    pub config: PathBuf,

    /// Optional measured-travel CSV (strict header); overrides rated times
    #[arg(long, value_name = "FILE")]
    pub travel_csv: Option<PathBuf>,

    /// Print output and logs as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to the config's
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the estimator in real time; reads commands like `close main` from stdin
    Run {
        /// Stop after this many milliseconds (default: until Ctrl-C or `quit`)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Start without leadership; send `leader-on` on stdin to acquire it
        #[arg(long, action = ArgAction::SetTrue)]
        follower: bool,
    },
    /// Replay a scripted scenario in virtual time
    Simulate {
        /// Comma-separated `action[:door]@ms` steps, e.g. `close@0,close@2000,close@10000`
        #[arg(long, value_name = "STEPS")]
        script: String,
        /// Door targeted by steps without `:door` (default: first configured door)
        #[arg(long, value_name = "ID")]
        door: Option<String>,
        /// Stop the timeline here (default: last step plus the longest rated time)
        #[arg(long, value_name = "MS")]
        until_ms: Option<u64>,
        /// Virtual tick period (default: runner.tick_rate_ms)
        #[arg(long, value_name = "MS")]
        step_ms: Option<u64>,
    },
    /// Validate config and report the doors that would be estimated
    SelfCheck,
}

/// Failures originating in the CLI itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("bad script: {0}")]
    BadScript(String),
    #[error("unknown door '{0}'")]
    UnknownDoor(String),
}

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}
