// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::EvaluationMode;

/// Command-line arguments for `calcdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "calcdag",
    version,
    about = "Evaluate arithmetic expressions as a DAG of operations run by parallel workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Expressions to evaluate, e.g. "2+2*2" or "(2+3)*(4-1)".
    #[arg(
        value_name = "EXPRESSION",
        required = true,
        num_args = 1..,
        allow_hyphen_values = true
    )]
    pub expressions: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Calcdag.toml` in the current working directory, if present;
    /// otherwise built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CALCDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Evaluation mode (`decomposed` or `whole`); overrides `[scheduler].mode`.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<EvaluationMode>,

    /// Number of workers; overrides `[agent].computing_power`.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Owner id the expressions are submitted under.
    #[arg(long, value_name = "ID", default_value_t = 1)]
    pub owner: u64,

    /// Validate and print each expression's units, but don't compute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print results as JSON instead of text.
    #[arg(long)]
    pub json: bool,
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
