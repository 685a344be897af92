use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyzer::coverage::{AnalysisToggles, DEFAULT_ERROR_KEYWORDS};

/// The only supported configuration schema version.
pub const CONFIG_VERSION: &str = "1.0";

/// Root configuration object. Unknown top-level keys are ignored; the
/// `version` key is required and gated on `CONFIG_VERSION`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub log_functions: LogFunctionsConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: Some(CONFIG_VERSION.to_string()),
            scan: ScanConfig::default(),
            log_functions: LogFunctionsConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn toggles(&self) -> AnalysisToggles {
        AnalysisToggles {
            function_coverage: self.analysis.function_coverage,
            branch_coverage: self.analysis.branch_coverage,
            exception_coverage: self.analysis.exception_coverage,
            key_path_coverage: self.analysis.key_path_coverage,
        }
    }

    /// The key-path keyword set: the configured list, or the built-in
    /// defaults when the list is empty.
    #[must_use]
    pub fn error_keywords(&self) -> Vec<String> {
        if self.analysis.error_keywords.is_empty() {
            DEFAULT_ERROR_KEYWORDS
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            self.analysis.error_keywords.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanConfig {
    #[serde(default = "default_directories")]
    pub directories: Vec<String>,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_extensions")]
    pub file_extensions: Vec<String>,

    #[serde(default)]
    pub compiler_args: Vec<String>,

    #[serde(default)]
    pub is_qt_project: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            exclude_patterns: Vec::new(),
            file_extensions: default_extensions(),
            compiler_args: Vec::new(),
            is_qt_project: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LogFunctionsConfig {
    #[serde(default)]
    pub qt: QtLogConfig,

    #[serde(default)]
    pub custom: CustomLogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QtLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_qt_functions")]
    pub functions: Vec<String>,

    #[serde(default = "default_qt_category_functions")]
    pub category_functions: Vec<String>,
}

impl Default for QtLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            functions: default_qt_functions(),
            category_functions: default_qt_category_functions(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomLogConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Level name → function names, for each of debug, info, warning,
    /// critical/error and fatal.
    #[serde(default)]
    pub functions: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalysisConfig {
    #[serde(default = "default_true")]
    pub function_coverage: bool,

    #[serde(default = "default_true")]
    pub branch_coverage: bool,

    #[serde(default = "default_true")]
    pub exception_coverage: bool,

    #[serde(default = "default_true")]
    pub key_path_coverage: bool,

    /// Guard keywords marking key paths; empty selects the built-in set.
    #[serde(default)]
    pub error_keywords: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            function_coverage: true,
            branch_coverage: true,
            exception_coverage: true,
            key_path_coverage: true,
            error_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_file: None,
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_directories() -> Vec<String> {
    vec![".".to_string()]
}

fn default_extensions() -> Vec<String> {
    ["cpp", "cc", "cxx", "c", "h", "hpp", "hxx", "hh"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_qt_functions() -> Vec<String> {
    ["qDebug", "qInfo", "qWarning", "qCritical", "qFatal"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_qt_category_functions() -> Vec<String> {
    ["qCDebug", "qCInfo", "qCWarning", "qCCritical"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
