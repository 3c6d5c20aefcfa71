// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::types::OutputMode;

/// Command-line arguments for `winedeck`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "winedeck",
    version,
    about = "Launch Windows programs inside a per-workspace compatibility-layer prefix.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the workspace config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path(), global = true)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WINEDECK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Launch a program (or `.lnk` shortcut) in the workspace.
    Run {
        /// Executable or shortcut to open.
        program: PathBuf,

        /// How the program's output is handled.
        #[arg(long, value_enum, default_value_t = OutputMode::Detached)]
        mode: OutputMode,

        /// Arguments passed to the program.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Sweep stale running-records and list the programs still running.
    Running,

    /// Force-quit everything the compatibility layer started.
    Reap,

    /// Parse + validate the config and print it, without launching anything.
    Check,
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
