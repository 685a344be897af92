use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DlogcoverError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    #[error("Failed to access file: {path}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", format_io_error(source, path, operation))]
    Io {
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
        operation: Option<&'static str>,
    },

    #[error("Invalid exclude pattern: {pattern}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Compile database not found: {0}")]
    DbMissing(PathBuf),

    #[error("Malformed compile database: {0}")]
    DbMalformed(String),

    #[error("File not present in compile database: {0}")]
    FileUnknown(PathBuf),

    #[error("Parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        line: Option<u32>,
    },

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("submit on stopped thread pool")]
    PoolStopped,

    #[error("Report generation error: {0}")]
    Report(String),
}

/// Formats IO error with optional context for display.
/// Uses references to Options as required by thiserror's `#[error(...)]` macro expansion.
#[allow(clippy::ref_option, clippy::ref_option_ref)]
fn format_io_error(
    source: &std::io::Error,
    path: &Option<PathBuf>,
    operation: &Option<&'static str>,
) -> String {
    match (path.as_ref(), *operation) {
        (Some(p), Some(op)) => format!("IO error ({op} '{}'): {source}", p.display()),
        (Some(p), None) => format!("IO error ('{}'): {source}", p.display()),
        (None, Some(op)) => format!("IO error ({op}): {source}"),
        (None, None) => format!("IO error: {source}"),
    }
}

impl From<std::io::Error> for DlogcoverError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            source: e,
            path: None,
            operation: None,
        }
    }
}

impl DlogcoverError {
    /// Creates an IO error with path context.
    #[must_use]
    pub const fn io_with_path(source: std::io::Error, path: PathBuf) -> Self {
        Self::Io {
            source,
            path: Some(path),
            operation: None,
        }
    }

    /// Creates an IO error with path and operation context.
    #[must_use]
    pub const fn io_with_context(
        source: std::io::Error,
        path: PathBuf,
        operation: &'static str,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path),
            operation: Some(operation),
        }
    }

    /// Creates a parse error without location information.
    #[must_use]
    pub fn parse(path: PathBuf, message: impl Into<String>) -> Self {
        Self::Parse {
            path,
            message: message.into(),
            line: None,
        }
    }

    /// Returns the error kind as a short string identifier.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::MissingField(_) => "Config",
            Self::FileAccess { .. } => "FileAccess",
            Self::Io { .. } => "IO",
            Self::InvalidPattern { .. } => "InvalidPattern",
            Self::JsonParse(_) => "JSON",
            Self::DbMissing(_) | Self::DbMalformed(_) | Self::FileUnknown(_) => "CompileDb",
            Self::Parse { .. } => "Parse",
            Self::Analysis(_) => "Analysis",
            Self::PoolStopped => "PoolStopped",
            Self::Report(_) => "Report",
        }
    }

    /// Returns true for errors that must abort the run: configuration
    /// problems before analysis, report failures after it, pool misuse.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::MissingField(_)
                | Self::JsonParse(_)
                | Self::Report(_)
                | Self::PoolStopped
        )
    }

    /// Returns the error message without the type prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::FileAccess { path, source } => {
                format!("{} ({})", path.display(), source.kind())
            }
            Self::Io {
                source,
                path,
                operation,
            } => match (path, operation) {
                (Some(p), Some(op)) => format!("{op} '{}': {source}", p.display()),
                (Some(p), None) => format!("'{}': {source}", p.display()),
                (None, Some(op)) => format!("{op}: {source}"),
                (None, None) => source.to_string(),
            },
            Self::InvalidPattern { pattern, detail } => format!("{pattern}: {detail}"),
            Self::JsonParse(e) => e.to_string(),
            Self::Parse {
                path,
                message,
                line,
            } => match line {
                Some(l) => format!("{}:{l}: {message}", path.display()),
                None => format!("{}: {message}", path.display()),
            },
            Self::DbMissing(path) | Self::FileUnknown(path) => path.display().to_string(),
            Self::Config(msg)
            | Self::MissingField(msg)
            | Self::DbMalformed(msg)
            | Self::Analysis(msg)
            | Self::Report(msg) => msg.clone(),
            Self::PoolStopped => "submit on stopped thread pool".to_string(),
        }
    }

    /// Returns an actionable suggestion for resolving the error.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) | Self::MissingField(_) => {
                Some("Check the config file format and required keys in dlogcover.json")
            }
            Self::FileAccess { source, .. } | Self::Io { source, .. } => {
                Self::io_suggestion(source.kind())
            }
            Self::InvalidPattern { .. } => {
                Some("Check glob pattern syntax: use '*' and '?' wildcards only")
            }
            Self::JsonParse(_) => Some("Check JSON syntax: quoting, commas and bracket matching"),
            Self::DbMissing(_) | Self::DbMalformed(_) | Self::FileUnknown(_) => Some(
                "Generate a compile_commands.json (e.g. cmake -DCMAKE_EXPORT_COMPILE_COMMANDS=ON) or rely on heuristic arguments",
            ),
            Self::Parse { .. } => {
                Some("Verify the file is valid C/C++ and its include paths are configured")
            }
            Self::Report(_) => Some("Verify the output path is writable"),
            Self::Analysis(_) | Self::PoolStopped => None,
        }
    }

    /// Returns a suggestion based on IO error kind.
    const fn io_suggestion(kind: std::io::ErrorKind) -> Option<&'static str> {
        match kind {
            std::io::ErrorKind::NotFound => Some("Verify the file path exists"),
            std::io::ErrorKind::PermissionDenied => {
                Some("Check file permissions or run with appropriate access rights")
            }
            std::io::ErrorKind::InvalidData => {
                Some("The file may be corrupted or in an unexpected format")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DlogcoverError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
