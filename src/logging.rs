use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use crate::analyzer::LogLevel;
use crate::error::{DlogcoverError, Result};

/// Maps the tool's level filter onto the `log` facade.
#[must_use]
pub fn level_filter(level: LogLevel, quiet: bool, verbose: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    if verbose {
        return LevelFilter::Debug;
    }
    match level {
        LogLevel::All => LevelFilter::Trace,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Unknown | LogLevel::Info => LevelFilter::Info,
        LogLevel::Warning => LevelFilter::Warn,
        LogLevel::Critical | LogLevel::Fatal => LevelFilter::Error,
    }
}

/// Initializes the process-wide logger: terminal output on stderr, plus a
/// log file when `log_file` is set. Safe to call once per process.
///
/// # Errors
/// Returns an error when the log file cannot be created.
pub fn init(level: LogLevel, quiet: bool, verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = level_filter(level, quiet, verbose);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        filter,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| DlogcoverError::io_with_context(e, path.to_path_buf(), "creating log file"))?;
        loggers.push(WriteLogger::new(filter, config, file));
    }

    CombinedLogger::init(loggers)
        .map_err(|e| DlogcoverError::Config(format!("logger already initialized: {e}")))
}
