use std::path::Path;

use crate::error::{DlogcoverError, Result};
use crate::fileutil;

use super::model::{CONFIG_VERSION, Config};

/// Default configuration file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dlogcover.json";

/// Environment variables recognized by the overlay, in the order they are
/// applied.
const ENV_DIRECTORY: &str = "DLOGCOVER_DIRECTORY";
const ENV_OUTPUT: &str = "DLOGCOVER_OUTPUT";
const ENV_LOG_PATH: &str = "DLOGCOVER_LOG_PATH";
const ENV_LOG_LEVEL: &str = "DLOGCOVER_LOG_LEVEL";
const ENV_REPORT_FORMAT: &str = "DLOGCOVER_REPORT_FORMAT";
const ENV_EXCLUDE: &str = "DLOGCOVER_EXCLUDE";

/// Loads the configuration file.
///
/// An explicitly requested file must exist; when only the default location
/// is probed and nothing is there, the built-in defaults apply. The
/// environment overlay runs after parsing, so precedence is
/// config < environment (< CLI, applied by the caller).
///
/// # Errors
/// Returns an error when the file cannot be read or fails validation.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let (path, explicit) = path.map_or((Path::new(DEFAULT_CONFIG_FILE), false), |p| (p, true));

    let mut config = if path.exists() {
        parse_config(&fileutil::read_to_string(path)?)?
    } else if explicit {
        return Err(DlogcoverError::FileAccess {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    } else {
        log::debug!("no {DEFAULT_CONFIG_FILE} found, using built-in defaults");
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parses and validates configuration content.
///
/// # Errors
/// `JsonParse` for malformed JSON, `MissingField` for an absent `version`,
/// `Config` for an unsupported version or invalid field values.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = serde_json::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let version = config
        .version
        .as_deref()
        .ok_or_else(|| DlogcoverError::MissingField("version".to_string()))?;
    if version != CONFIG_VERSION {
        return Err(DlogcoverError::Config(format!(
            "Unsupported config version: {version} (expected {CONFIG_VERSION})"
        )));
    }

    config
        .output
        .log_level
        .parse::<crate::analyzer::LogLevel>()
        .map_err(DlogcoverError::Config)?;

    config
        .report
        .format
        .parse::<crate::report::ReportFormat>()
        .map_err(DlogcoverError::Config)?;

    if config.scan.directories.is_empty() {
        return Err(DlogcoverError::Config(
            "scan.directories must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Applies the `DLOGCOVER_*` environment overlay on top of file values.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(directory) = std::env::var(ENV_DIRECTORY)
        && !directory.is_empty()
    {
        config.scan.directories = vec![directory];
    }
    if let Ok(output) = std::env::var(ENV_OUTPUT)
        && !output.is_empty()
    {
        config.output.report_file = Some(output);
    }
    if let Ok(log_path) = std::env::var(ENV_LOG_PATH)
        && !log_path.is_empty()
    {
        config.output.log_file = Some(log_path);
    }
    if let Ok(level) = std::env::var(ENV_LOG_LEVEL)
        && !level.is_empty()
    {
        config.output.log_level = level;
    }
    if let Ok(format) = std::env::var(ENV_REPORT_FORMAT)
        && !format.is_empty()
    {
        config.report.format = format;
    }
    if let Ok(excludes) = std::env::var(ENV_EXCLUDE) {
        for pattern in excludes.split(',').filter(|p| !p.is_empty()) {
            config.scan.exclude_patterns.push(pattern.to_string());
        }
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
