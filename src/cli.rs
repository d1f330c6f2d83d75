// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `modflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "modflow",
    version,
    about = "Inspect module dependency graphs derived from channel declarations.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Modflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Modflow.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MODFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the resolved execution order and per-module dependencies.
    Plan,

    /// Write the dependency graph as GraphViz dot to stdout.
    Dot {
        /// Keep edges implied by longer paths instead of pruning them.
        #[arg(long)]
        keep_transitive: bool,
    },
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
