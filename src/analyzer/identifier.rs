use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::ast::{AstNode, Location, NodeKind};
use crate::config::LogFunctionsConfig;

/// Log severity. A single ordered set: the `critical` and `error` spellings
/// name the same level, `All` disables filtering and `Unknown` marks calls
/// whose name was never registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Unknown,
    Debug,
    Info,
    Warning,
    Critical,
    Fatal,
    All,
}

impl LogLevel {
    /// Whether a message at `self` passes a filter set to `filter`.
    #[must_use]
    pub fn passes(self, filter: Self) -> bool {
        filter == Self::All || self >= filter
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Fatal => "fatal",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" | "error" => Ok(Self::Critical),
            "fatal" => Ok(Self::Fatal),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown log level: {s}")),
        }
    }
}

/// Provider class of a logging API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    Qt,
    QtCategory,
    Custom,
    #[default]
    Unknown,
}

/// Syntactic flavor of a recognized log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStyle {
    #[default]
    Direct,
    Macro,
    Function,
    Stream,
    Format,
}

/// One identified log call inside a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCall {
    pub function_name: String,
    pub level: LogLevel,
    pub log_type: LogType,
    pub style: CallStyle,
    pub location: Location,
    /// First string-literal argument, best-effort; empty when absent.
    pub message: String,
    /// Category identifier of a Qt category call.
    pub category: Option<String>,
    /// Name of the enclosing function/method, with namespace prefix.
    pub context_path: String,
    pub arg_count: usize,
    pub arg_preview: String,
}

/// Fixed level map for the Qt built-in functions.
const QT_LEVELS: &[(&str, LogLevel)] = &[
    ("qDebug", LogLevel::Debug),
    ("qInfo", LogLevel::Info),
    ("qWarning", LogLevel::Warning),
    ("qCritical", LogLevel::Critical),
    ("qFatal", LogLevel::Fatal),
];

/// Fixed level map for the Qt category functions.
const QT_CATEGORY_LEVELS: &[(&str, LogLevel)] = &[
    ("qCDebug", LogLevel::Debug),
    ("qCInfo", LogLevel::Info),
    ("qCWarning", LogLevel::Warning),
    ("qCCritical", LogLevel::Critical),
];

/// Name → level/type tables built once from configuration and read-only
/// afterwards; the three sources (Qt, Qt category, custom) are disjoint by
/// convention.
#[derive(Debug, Default)]
pub struct LogFunctionTable {
    names: HashSet<String>,
    levels: HashMap<String, LogLevel>,
    types: HashMap<String, LogType>,
}

impl LogFunctionTable {
    #[must_use]
    pub fn from_config(config: &LogFunctionsConfig) -> Self {
        let mut table = Self::default();

        if config.qt.enabled {
            for name in &config.qt.functions {
                let level = QT_LEVELS
                    .iter()
                    .find(|(known, _)| known == name)
                    .map_or(LogLevel::Unknown, |(_, level)| *level);
                table.register(name, level, LogType::Qt);
            }
            for name in &config.qt.category_functions {
                let level = QT_CATEGORY_LEVELS
                    .iter()
                    .find(|(known, _)| known == name)
                    .map_or(LogLevel::Unknown, |(_, level)| *level);
                table.register(name, level, LogType::QtCategory);
            }
        }

        if config.custom.enabled {
            for (level_name, names) in &config.custom.functions {
                let level = level_name.parse().unwrap_or(LogLevel::Unknown);
                for name in names {
                    table.register(name, level, LogType::Custom);
                }
            }
        }

        log::debug!("registered {} log function names", table.names.len());
        table
    }

    fn register(&mut self, name: &str, level: LogLevel, log_type: LogType) {
        self.names.insert(name.to_string());
        self.levels.insert(name.to_string(), level);
        self.types.insert(name.to_string(), log_type);
    }

    /// The union name set consulted by the expression visitor.
    #[must_use]
    pub const fn names(&self) -> &HashSet<String> {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolves the level of a call name; unregistered names are `Unknown`.
    #[must_use]
    pub fn level_of(&self, name: &str) -> LogLevel {
        self.resolve(&self.levels, name).unwrap_or_default()
    }

    /// Resolves the provider of a call name; unregistered names are
    /// `Unknown`.
    #[must_use]
    pub fn type_of(&self, name: &str) -> LogType {
        self.resolve(&self.types, name).unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || last_segment(name).is_some_and(|s| self.names.contains(s))
    }

    fn resolve<T: Copy>(&self, map: &HashMap<String, T>, name: &str) -> Option<T> {
        map.get(name)
            .or_else(|| last_segment(name).and_then(|s| map.get(s)))
            .copied()
    }

    /// Walks a file's tree and synthesizes a `LogCall` for every
    /// `LogCallExpr` and every `CallExpr` whose name is registered.
    #[must_use]
    pub fn identify(&self, root: &AstNode) -> Vec<LogCall> {
        let mut calls = Vec::new();
        self.identify_in(root, "", &mut calls);
        calls
    }

    fn identify_in(&self, node: &AstNode, context: &str, calls: &mut Vec<LogCall>) {
        let context_here = if node.kind.is_function() {
            node.name.as_str()
        } else {
            context
        };

        let is_candidate = node.kind == NodeKind::LogCallExpr
            || (node.kind == NodeKind::CallExpr && self.contains(&node.name));
        if is_candidate {
            calls.push(self.make_call(node, context_here));
        }

        for child in &node.children {
            self.identify_in(child, context_here, calls);
        }
    }

    fn make_call(&self, node: &AstNode, context: &str) -> LogCall {
        let level = self.level_of(&node.name);
        let log_type = self.type_of(&node.name);
        let (arg_count, arg_preview) = argument_summary(&node.text);
        let category = if log_type == LogType::QtCategory {
            extract_category(&node.text)
        } else {
            None
        };

        LogCall {
            function_name: node.name.clone(),
            level,
            log_type,
            style: classify_style(&node.name, log_type),
            location: node.location,
            message: extract_message(&node.text),
            category,
            context_path: context.to_string(),
            arg_count,
            arg_preview,
        }
    }
}

fn last_segment(name: &str) -> Option<&str> {
    name.rsplit("::").next().filter(|s| *s != name)
}

fn classify_style(name: &str, log_type: LogType) -> CallStyle {
    match log_type {
        LogType::Qt | LogType::QtCategory => CallStyle::Stream,
        _ => {
            let has_alpha = name.chars().any(|c| c.is_ascii_alphabetic());
            if has_alpha && !name.chars().any(|c| c.is_ascii_lowercase()) {
                CallStyle::Macro
            } else if name.to_ascii_lowercase().ends_with("_fmt") {
                CallStyle::Format
            } else {
                CallStyle::Function
            }
        }
    }
}

/// Extracts the first string literal from call text, regex-free. The scan
/// honors backslash escapes, so embedded `\"` does not terminate the
/// literal. Returns the raw literal content; empty when no literal exists.
#[must_use]
pub fn extract_message(text: &str) -> String {
    let mut chars = text.chars();
    // Find the opening quote.
    loop {
        match chars.next() {
            Some('"') => break,
            Some('\\') => {
                chars.next();
            }
            Some(_) => {}
            None => return String::new(),
        }
    }

    let mut message = String::new();
    loop {
        match chars.next() {
            Some('\\') => {
                message.push('\\');
                if let Some(escaped) = chars.next() {
                    message.push(escaped);
                }
            }
            Some('"') | None => break,
            Some(c) => message.push(c),
        }
    }
    message
}

/// Extracts the category identifier of a Qt category call: the first
/// identifier argument before any stream operator.
fn extract_category(text: &str) -> Option<String> {
    let open = text.find('(')?;
    let rest = &text[open + 1..];
    let end = rest.find([',', ')'])?;
    let candidate = rest[..end].trim();
    let is_identifier = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    is_identifier.then(|| candidate.to_string())
}

/// Counts top-level arguments of the call's parenthesized list and returns
/// a short preview of the argument text.
fn argument_summary(text: &str) -> (usize, String) {
    let Some(open) = text.find('(') else {
        return (0, String::new());
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut args = 0usize;
    let mut has_content = false;
    let mut body = String::new();

    for c in text[open..].chars() {
        if escaped {
            escaped = false;
            if depth > 0 {
                body.push(c);
            }
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => {
                in_string = !in_string;
                has_content = true;
                if depth > 0 {
                    body.push(c);
                }
            }
            '(' if !in_string => {
                depth += 1;
                if depth > 1 {
                    body.push(c);
                }
            }
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                body.push(c);
            }
            ',' if !in_string && depth == 1 => {
                args += 1;
                body.push(c);
            }
            c => {
                if !c.is_whitespace() {
                    has_content = true;
                }
                if depth > 0 {
                    body.push(c);
                }
            }
        }
    }

    let count = if has_content && !body.trim().is_empty() {
        args + 1
    } else {
        0
    };
    let preview: String = body.trim().chars().take(64).collect();
    (count, preview)
}

#[cfg(test)]
#[path = "identifier_tests.rs"]
mod tests;
