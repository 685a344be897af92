use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::analyzer::LogLevel;
use crate::report::ReportFormat;

/// Log level filter accepted by `-l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Debug,
    Info,
    Warning,
    Critical,
    Fatal,
    All,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Debug => Self::Debug,
            LogLevelArg::Info => Self::Info,
            LogLevelArg::Warning => Self::Warning,
            LogLevelArg::Critical => Self::Critical,
            LogLevelArg::Fatal => Self::Fatal,
            LogLevelArg::All => Self::All,
        }
    }
}

/// Report format accepted by `-f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dlogcover")]
#[command(
    author,
    version,
    about = "Measure logging coverage of C/C++ codebases",
    long_about = "Measure logging coverage of a C/C++ codebase: for every function, branch, \
    exception handler and error-handling key path, determine whether a configured logging \
    call is present, and emit a text or JSON report."
)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are inherently boolean
pub struct Cli {
    /// Project root to scan
    #[arg(short = 'd', long)]
    pub directory: Option<PathBuf>,

    /// Report output path (defaults to a timestamped file name)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Configuration file path (defaults to ./dlogcover.json)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Exclude glob pattern, repeatable
    #[arg(short = 'e', long = "exclude")]
    pub exclude: Vec<String>,

    /// Log level filter for the tool's own output
    #[arg(short = 'l', long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum)]
    pub format: Option<FormatArg>,

    /// Path of the tool's own log file
    #[arg(short = 'p', long = "log-path")]
    pub log_path: Option<PathBuf>,

    /// Additional include path for parsing, repeatable
    #[arg(short = 'I', long = "include-path")]
    pub include_path: Vec<PathBuf>,

    /// Suppress non-essential output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(long)]
    pub verbose: bool,

    /// Worker thread budget (defaults to hardware concurrency)
    #[arg(long = "max-threads")]
    pub max_threads: Option<usize>,

    /// Force single-threaded analysis
    #[arg(long = "disable-parallel")]
    pub disable_parallel: bool,

    /// Disable the AST cache
    #[arg(long = "disable-cache")]
    pub disable_cache: bool,

    /// AST cache entry cap
    #[arg(long = "max-cache-size")]
    pub max_cache_size: Option<usize>,

    /// Disable single-read file IO optimization
    #[arg(long = "disable-io-opt")]
    pub disable_io_opt: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
