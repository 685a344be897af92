use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzer::{
    AnalysisToggles, FileCoverage, LogLevel, MetricStats, ProjectCoverage, UncoveredSite,
};
use crate::error::{DlogcoverError, Result};
use crate::fileutil;

use super::{ProgressCallback, ReportFormat, ReportStrategy};

/// Structured JSON report: `{ metadata, overall, files[] }`.
pub struct JsonReportStrategy;

#[derive(Serialize, Deserialize)]
pub(crate) struct JsonReport {
    pub metadata: Metadata,
    pub overall: Overall,
    pub files: Vec<FileEntry>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct Metadata {
    pub tool: String,
    pub version: String,
    pub generated_at: String,
    pub files_analyzed: usize,
    pub error_files: usize,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct Overall {
    pub function: MetricEntry,
    pub branch: MetricEntry,
    pub exception: MetricEntry,
    pub key_path: MetricEntry,
    pub overall_ratio: f64,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct MetricEntry {
    pub total: usize,
    pub covered: usize,
    pub ratio: f64,
    /// True when the ratio is the zero-denominator 1.0.
    pub vacuous: bool,
    pub enabled: bool,
}

impl MetricEntry {
    fn new(stats: &MetricStats, enabled: bool) -> Self {
        Self {
            total: stats.total,
            covered: stats.covered,
            ratio: stats.ratio(),
            vacuous: stats.is_vacuous(),
            enabled,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct FileEntry {
    pub path: String,
    pub function: MetricEntry,
    pub branch: MetricEntry,
    pub exception: MetricEntry,
    pub key_path: MetricEntry,
    pub overall_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub uncovered: Vec<UncoveredEntry>,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct UncoveredEntry {
    pub metric: String,
    pub kind: String,
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub suggestion: String,
    pub recommended_level: String,
}

impl UncoveredEntry {
    fn new(site: &UncoveredSite) -> Self {
        Self {
            metric: site.metric.display_name().to_string(),
            kind: site.node_kind.display_name().to_string(),
            name: site.name.clone(),
            line: site.location.line,
            column: site.location.column,
            suggestion: site.suggestion.clone(),
            recommended_level: level_name(site.recommended_level),
        }
    }
}

fn level_name(level: LogLevel) -> String {
    level.to_string()
}

impl JsonReportStrategy {
    pub(crate) fn build(
        project: &ProjectCoverage,
        files: &[FileCoverage],
        toggles: &AnalysisToggles,
        progress: ProgressCallback<'_>,
    ) -> JsonReport {
        let total = files.len();
        let file_entries = files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                if let Some(callback) = progress {
                    callback(index + 1, total, &file.relative_path.display().to_string());
                }
                FileEntry {
                    path: file.relative_path.display().to_string().replace('\\', "/"),
                    function: MetricEntry::new(&file.functions, toggles.function_coverage),
                    branch: MetricEntry::new(&file.branches, toggles.branch_coverage),
                    exception: MetricEntry::new(&file.exceptions, toggles.exception_coverage),
                    key_path: MetricEntry::new(&file.key_paths, toggles.key_path_coverage),
                    overall_ratio: file.overall(toggles),
                    error: file.error.clone(),
                    uncovered: file.uncovered.iter().map(UncoveredEntry::new).collect(),
                }
            })
            .collect();

        JsonReport {
            metadata: Metadata {
                tool: "dlogcover".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: chrono::Local::now().to_rfc3339(),
                files_analyzed: project.files,
                error_files: project.error_files,
            },
            overall: Overall {
                function: MetricEntry::new(&project.functions, toggles.function_coverage),
                branch: MetricEntry::new(&project.branches, toggles.branch_coverage),
                exception: MetricEntry::new(&project.exceptions, toggles.exception_coverage),
                key_path: MetricEntry::new(&project.key_paths, toggles.key_path_coverage),
                overall_ratio: project.overall(toggles),
            },
            files: file_entries,
        }
    }
}

impl ReportStrategy for JsonReportStrategy {
    fn name(&self) -> &'static str {
        "JSON"
    }

    fn extension(&self) -> &'static str {
        ".json"
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn generate(
        &self,
        output_path: &Path,
        project: &ProjectCoverage,
        files: &[FileCoverage],
        toggles: &AnalysisToggles,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let report = Self::build(project, files, toggles, progress);
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| DlogcoverError::Report(e.to_string()))?;
        fileutil::write_bytes(output_path, rendered.as_bytes(), true)
            .map_err(|e| DlogcoverError::Report(e.message()))
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
