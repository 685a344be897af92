use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::analyzer::{AnalysisToggles, FileCoverage, MetricStats, ProjectCoverage};
use crate::error::{DlogcoverError, Result};
use crate::fileutil;

use super::{ProgressCallback, ReportFormat, ReportStrategy, progress_bar};

const BAR_WIDTH: usize = 50;
const SECTION_RULE: &str =
    "------------------------------------------------------------";

/// Section-headed, bar-chart annotated text report.
pub struct TextReportStrategy;

impl TextReportStrategy {
    fn render(
        project: &ProjectCoverage,
        files: &[FileCoverage],
        toggles: &AnalysisToggles,
        progress: ProgressCallback<'_>,
    ) -> String {
        let mut out = String::new();
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        let _ = writeln!(out, "DLogCover Coverage Report");
        let _ = writeln!(out, "Generated: {timestamp}");
        let _ = writeln!(out, "{SECTION_RULE}");
        let _ = writeln!(out);

        let _ = writeln!(out, "Overall Coverage");
        let _ = writeln!(out, "{SECTION_RULE}");
        let _ = writeln!(
            out,
            "Files analyzed: {} ({} with parse errors)",
            project.files, project.error_files
        );
        write_metric(&mut out, "Function coverage", &project.functions, toggles.function_coverage);
        write_metric(&mut out, "Branch coverage", &project.branches, toggles.branch_coverage);
        write_metric(
            &mut out,
            "Exception coverage",
            &project.exceptions,
            toggles.exception_coverage,
        );
        write_metric(&mut out, "Key path coverage", &project.key_paths, toggles.key_path_coverage);
        let overall = project.overall(toggles);
        let _ = writeln!(
            out,
            "Overall:            {:>6.1}%  {}",
            overall * 100.0,
            progress_bar(overall, BAR_WIDTH)
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "Per-file Coverage");
        let _ = writeln!(out, "{SECTION_RULE}");
        let total = files.len();
        for (index, file) in files.iter().enumerate() {
            if let Some(callback) = progress {
                callback(index + 1, total, &file.relative_path.display().to_string());
            }
            write_file(&mut out, file, toggles);
        }

        out
    }
}

fn write_metric(out: &mut String, label: &str, stats: &MetricStats, enabled: bool) {
    if !enabled {
        let _ = writeln!(out, "{label}: disabled");
        return;
    }
    let note = if stats.is_vacuous() {
        " (no elements)"
    } else {
        ""
    };
    let _ = writeln!(
        out,
        "{label}: {:>6.1}% ({}/{}){note}  {}",
        stats.ratio() * 100.0,
        stats.covered,
        stats.total,
        progress_bar(stats.ratio(), BAR_WIDTH)
    );
}

fn write_file(out: &mut String, file: &FileCoverage, toggles: &AnalysisToggles) {
    let _ = writeln!(out, "{}", file.relative_path.display());
    if let Some(ref note) = file.error {
        let _ = writeln!(out, "  parse error: {note}");
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(
        out,
        "  functions {}/{}, branches {}/{}, exceptions {}/{}, key paths {}/{}  ({:.1}%)",
        file.functions.covered,
        file.functions.total,
        file.branches.covered,
        file.branches.total,
        file.exceptions.covered,
        file.exceptions.total,
        file.key_paths.covered,
        file.key_paths.total,
        file.overall(toggles) * 100.0
    );

    if !file.uncovered.is_empty() {
        let _ = writeln!(out, "  suggestions:");
        for site in &file.uncovered {
            let _ = writeln!(
                out,
                "    - [{}] {}:{} {}",
                site.metric.display_name(),
                site.location.line,
                site.location.column,
                site.suggestion
            );
        }
    }
    let _ = writeln!(out);
}

impl ReportStrategy for TextReportStrategy {
    fn name(&self) -> &'static str {
        "TEXT"
    }

    fn extension(&self) -> &'static str {
        ".txt"
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Text
    }

    fn generate(
        &self,
        output_path: &Path,
        project: &ProjectCoverage,
        files: &[FileCoverage],
        toggles: &AnalysisToggles,
        progress: ProgressCallback<'_>,
    ) -> Result<()> {
        let rendered = Self::render(project, files, toggles, progress);
        fileutil::write_bytes(output_path, rendered.as_bytes(), true)
            .map_err(|e| DlogcoverError::Report(e.message()))
    }
}

#[cfg(test)]
#[path = "text_tests.rs"]
mod tests;
