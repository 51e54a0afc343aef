// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::SchedulingMode;

/// Command-line arguments for `dagsched`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dagsched",
    version,
    about = "Schedule a DAG of tasks onto resource pools with level-gated admission.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workflow/config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Dagsched.toml")]
    pub config: String,

    /// Override `[scheduler].mode` from the config file.
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Override `[scheduler].batch_size` from the config file.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DAGSCHED_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print pools and tasks with their levels, but don't
    /// schedule anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Scheduling mode as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ModeArg {
    Direct,
    Central,
}

impl From<ModeArg> for SchedulingMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Direct => SchedulingMode::Direct,
            ModeArg::Central => SchedulingMode::Central,
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
