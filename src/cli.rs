// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{ArgAction, Parser, ValueEnum};

/// Command-line arguments for `asmpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "asmpipe",
    version,
    about = "Run a declarative genome-assembly pipeline, re-running only stale tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "asmpipe.toml")]
    pub config: String,

    /// Discovery root; overrides `[catalog].root`.
    #[arg(long, value_name = "DIR")]
    pub root: Option<String>,

    /// Maximum concurrent tasks; overrides `[config].max_jobs`.
    #[arg(long, short = 'j', value_name = "K")]
    pub jobs: Option<usize>,

    /// Run only this stage and everything upstream of it.
    #[arg(long, value_name = "STAGE")]
    pub target: Option<String>,

    /// Assemble the graph and print what would run, without running it.
    #[arg(long)]
    pub dry_run: bool,

    /// Write the task graph as Graphviz DOT; overrides `[config].flowchart`.
    #[arg(long, value_name = "PATH")]
    pub flowchart: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `-v`, then `ASMPIPE_LOG`, then `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Increase verbosity (`-v` debug, `-vv` trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Level chosen on the command line, if any.
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        self.log_level.or(match self.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        })
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
