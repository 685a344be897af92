mod json;
mod text;

pub use json::JsonReportStrategy;
pub use text::TextReportStrategy;

use std::path::Path;

use indexmap::IndexMap;

use crate::analyzer::{AnalysisToggles, FileCoverage, ProjectCoverage};
use crate::error::Result;

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {s}")),
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

/// Progress callback: `(current, total, message)`.
pub type ProgressCallback<'a> = Option<&'a dyn Fn(usize, usize, &str)>;

/// Format-agnostic report emitter.
pub trait ReportStrategy {
    fn name(&self) -> &'static str;

    /// File extension including the leading dot.
    fn extension(&self) -> &'static str;

    fn format(&self) -> ReportFormat;

    /// Renders the statistics and writes them to `output_path`, creating
    /// parent directories on demand.
    ///
    /// # Errors
    /// Returns a `Report` error when rendering or writing fails.
    fn generate(
        &self,
        output_path: &Path,
        project: &ProjectCoverage,
        files: &[FileCoverage],
        toggles: &AnalysisToggles,
        progress: ProgressCallback<'_>,
    ) -> Result<()>;
}

/// Maps formats to strategies in registration order. Requests for an
/// unregistered format warn and fall back to the text strategy.
pub struct ReporterRegistry {
    strategies: IndexMap<ReportFormat, Box<dyn ReportStrategy>>,
}

impl Default for ReporterRegistry {
    fn default() -> Self {
        let mut registry = Self {
            strategies: IndexMap::new(),
        };
        registry.register(Box::new(TextReportStrategy));
        registry.register(Box::new(JsonReportStrategy));
        registry
    }
}

impl ReporterRegistry {
    pub fn register(&mut self, strategy: Box<dyn ReportStrategy>) {
        self.strategies.insert(strategy.format(), strategy);
    }

    /// Resolves a strategy; an unregistered format falls back to `Text`.
    #[must_use]
    pub fn strategy_for(&self, format: ReportFormat) -> &dyn ReportStrategy {
        if let Some(strategy) = self.strategies.get(&format) {
            return strategy.as_ref();
        }
        log::warn!("no strategy registered for format {format}, falling back to text");
        self.strategies
            .get(&ReportFormat::Text)
            .expect("text strategy is always registered")
            .as_ref()
    }

    #[must_use]
    pub fn supported_formats(&self) -> Vec<ReportFormat> {
        self.strategies.keys().copied().collect()
    }
}

/// Renders a fixed-width coverage bar, `█` for covered and `░` for the
/// remainder.
#[must_use]
pub fn progress_bar(ratio: f64, width: usize) -> String {
    let clamped = ratio.clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width * 3);
    for _ in 0..filled {
        bar.push('█');
    }
    for _ in filled..width {
        bar.push('░');
    }
    bar
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
