use std::path::PathBuf;

use serde::Serialize;

use super::identifier::LogLevel;
use crate::ast::{AstNode, Location, NodeKind};

/// Default guard keywords marking a branch as a key path.
pub const DEFAULT_ERROR_KEYWORDS: &[&str] = &[
    "error", "fail", "exception", "invalid", "denied", "null", "nullptr", "-1",
];

/// The four coverage metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Function,
    Branch,
    Exception,
    KeyPath,
}

impl MetricKind {
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Branch => "branch",
            Self::Exception => "exception handling",
            Self::KeyPath => "key path",
        }
    }
}

/// `(total, covered)` pair for one metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricStats {
    pub total: usize,
    pub covered: usize,
}

impl MetricStats {
    /// Coverage ratio; vacuously 1.0 when nothing was counted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.covered as f64 / self.total as f64
        }
    }

    /// True when the ratio is the zero-denominator 1.0.
    #[must_use]
    pub const fn is_vacuous(&self) -> bool {
        self.total == 0
    }

    pub fn record(&mut self, covered: bool) {
        self.total += 1;
        if covered {
            self.covered += 1;
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.total += other.total;
        self.covered += other.covered;
    }
}

/// One uncovered element with its improvement suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredSite {
    pub metric: MetricKind,
    pub node_kind: NodeKind,
    pub name: String,
    pub location: Location,
    pub suggestion: String,
    pub recommended_level: LogLevel,
}

/// Which metrics participate in the overall ratio. Enabled metrics carry
/// equal weight; disabled metrics carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalysisToggles {
    pub function_coverage: bool,
    pub branch_coverage: bool,
    pub exception_coverage: bool,
    pub key_path_coverage: bool,
}

impl Default for AnalysisToggles {
    fn default() -> Self {
        Self {
            function_coverage: true,
            branch_coverage: true,
            exception_coverage: true,
            key_path_coverage: true,
        }
    }
}

/// Per-function counters produced by the analyze stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionCounters {
    pub functions: MetricStats,
    pub branches: MetricStats,
    pub exceptions: MetricStats,
    pub key_paths: MetricStats,
    pub uncovered: Vec<UncoveredSite>,
}

impl FunctionCounters {
    pub fn merge(&mut self, other: Self) {
        self.functions.merge(other.functions);
        self.branches.merge(other.branches);
        self.exceptions.merge(other.exceptions);
        self.key_paths.merge(other.key_paths);
        self.uncovered.extend(other.uncovered);
    }
}

/// Coverage of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileCoverage {
    pub relative_path: PathBuf,
    pub functions: MetricStats,
    pub branches: MetricStats,
    pub exceptions: MetricStats,
    pub key_paths: MetricStats,
    pub uncovered: Vec<UncoveredSite>,
    /// Parse failure note; such files count with zeroed metrics.
    pub error: Option<String>,
}

impl FileCoverage {
    #[must_use]
    pub fn from_counters(relative_path: PathBuf, counters: FunctionCounters) -> Self {
        Self {
            relative_path,
            functions: counters.functions,
            branches: counters.branches,
            exceptions: counters.exceptions,
            key_paths: counters.key_paths,
            uncovered: counters.uncovered,
            error: None,
        }
    }

    #[must_use]
    pub fn error_file(relative_path: PathBuf, note: impl Into<String>) -> Self {
        Self {
            relative_path,
            error: Some(note.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn overall(&self, toggles: &AnalysisToggles) -> f64 {
        weighted_overall(
            toggles,
            self.functions.ratio(),
            self.branches.ratio(),
            self.exceptions.ratio(),
            self.key_paths.ratio(),
        )
    }
}

/// Componentwise project totals. Ratios are recomputed from the sums, not
/// averaged across files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectCoverage {
    pub files: usize,
    pub error_files: usize,
    pub functions: MetricStats,
    pub branches: MetricStats,
    pub exceptions: MetricStats,
    pub key_paths: MetricStats,
}

impl ProjectCoverage {
    #[must_use]
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a FileCoverage>) -> Self {
        let mut project = Self::default();
        for file in files {
            project.files += 1;
            if file.error.is_some() {
                project.error_files += 1;
            }
            project.functions.merge(file.functions);
            project.branches.merge(file.branches);
            project.exceptions.merge(file.exceptions);
            project.key_paths.merge(file.key_paths);
        }
        project
    }

    #[must_use]
    pub fn overall(&self, toggles: &AnalysisToggles) -> f64 {
        weighted_overall(
            toggles,
            self.functions.ratio(),
            self.branches.ratio(),
            self.exceptions.ratio(),
            self.key_paths.ratio(),
        )
    }
}

fn weighted_overall(
    toggles: &AnalysisToggles,
    functions: f64,
    branches: f64,
    exceptions: f64,
    key_paths: f64,
) -> f64 {
    let weighted = [
        (toggles.function_coverage, functions),
        (toggles.branch_coverage, branches),
        (toggles.exception_coverage, exceptions),
        (toggles.key_path_coverage, key_paths),
    ];
    let enabled = weighted.iter().filter(|(on, _)| *on).count();
    if enabled == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let denominator = enabled as f64;
    weighted
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, ratio)| ratio)
        .sum::<f64>()
        / denominator
}

/// Computes the four metrics over function subtrees. An element is covered
/// when its `has_logging` flag is set, i.e. a recognized log call is
/// lexically reachable in its subtree.
#[derive(Debug)]
pub struct CoverageCalculator {
    keywords: Vec<String>,
    toggles: AnalysisToggles,
}

impl Default for CoverageCalculator {
    fn default() -> Self {
        Self::new(
            DEFAULT_ERROR_KEYWORDS.iter().map(ToString::to_string),
            AnalysisToggles::default(),
        )
    }
}

impl CoverageCalculator {
    pub fn new(keywords: impl IntoIterator<Item = String>, toggles: AnalysisToggles) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.to_lowercase())
                .collect(),
            toggles,
        }
    }

    #[must_use]
    pub const fn toggles(&self) -> &AnalysisToggles {
        &self.toggles
    }

    /// Folds one `Function`/`Method` node (with its subtree) into metric
    /// counters and uncovered-site suggestions.
    #[must_use]
    pub fn analyze_function(&self, function: &AstNode) -> FunctionCounters {
        let mut counters = FunctionCounters::default();
        if !function.kind.is_function() {
            return counters;
        }

        if self.toggles.function_coverage {
            counters.functions.record(function.has_logging);
            if !function.has_logging {
                counters.uncovered.push(suggestion_for(
                    MetricKind::Function,
                    function,
                    LogLevel::Info,
                ));
            }
        }

        function.walk(&mut |node| {
            if self.toggles.branch_coverage && node.kind.is_branch() {
                counters.branches.record(node.has_logging);
                if !node.has_logging {
                    counters.uncovered.push(suggestion_for(
                        MetricKind::Branch,
                        node,
                        LogLevel::Warning,
                    ));
                }
            }
            if self.toggles.exception_coverage && node.kind.is_exception() {
                counters.exceptions.record(node.has_logging);
                if !node.has_logging {
                    counters.uncovered.push(suggestion_for(
                        MetricKind::Exception,
                        node,
                        LogLevel::Critical,
                    ));
                }
            }
            if self.toggles.key_path_coverage && self.is_key_path(node) {
                counters.key_paths.record(node.has_logging);
                if !node.has_logging {
                    counters.uncovered.push(suggestion_for(
                        MetricKind::KeyPath,
                        node,
                        LogLevel::Warning,
                    ));
                }
            }
        });

        counters
    }

    /// Folds every top-level function of a file tree.
    #[must_use]
    pub fn analyze_file(&self, root: &AstNode) -> FunctionCounters {
        let mut counters = FunctionCounters::default();
        root.walk(&mut |node| {
            if node.kind.is_function() {
                counters.merge(self.analyze_function(node));
            }
        });
        counters
    }

    /// A key path is a guard-bearing branch whose guard text contains an
    /// error keyword, case-insensitively.
    fn is_key_path(&self, node: &AstNode) -> bool {
        if !node.kind.has_guard() {
            return false;
        }
        let guard = node.name.to_lowercase();
        self.keywords.iter().any(|keyword| guard.contains(keyword))
    }
}

fn suggestion_for(metric: MetricKind, node: &AstNode, level: LogLevel) -> UncoveredSite {
    let place = if node.name.is_empty() {
        node.kind.display_name().to_string()
    } else {
        format!("{} '{}'", node.kind.display_name(), node.name)
    };
    UncoveredSite {
        metric,
        node_kind: node.kind,
        name: node.name.clone(),
        location: node.location,
        suggestion: format!(
            "{} at line {} has no logging; add a {} level log call",
            place, node.location.line, level
        ),
        recommended_level: level,
    }
}

#[cfg(test)]
#[path = "coverage_tests.rs"]
mod tests;
