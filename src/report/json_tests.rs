use std::path::PathBuf;

use super::*;
use crate::analyzer::{
    AnalysisToggles, FileCoverage, MetricKind, MetricStats, ProjectCoverage, UncoveredSite,
};
use crate::ast::{Location, NodeKind};
use crate::fileutil::scoped_temp_dir;

fn sample_files() -> Vec<FileCoverage> {
    vec![
        FileCoverage {
            relative_path: PathBuf::from("src/a.cpp"),
            functions: MetricStats { total: 4, covered: 3 },
            branches: MetricStats { total: 8, covered: 4 },
            key_paths: MetricStats { total: 2, covered: 1 },
            uncovered: vec![UncoveredSite {
                metric: MetricKind::KeyPath,
                node_kind: NodeKind::If,
                name: "(rc == -1)".to_string(),
                location: Location::new(40, 9),
                suggestion: "if branch '(rc == -1)' at line 40 has no logging; add a warning level log call".to_string(),
                recommended_level: crate::analyzer::LogLevel::Warning,
            }],
            ..FileCoverage::default()
        },
        FileCoverage::error_file(PathBuf::from("src/bad.cpp"), "syntax error"),
    ]
}

fn generate(files: &[FileCoverage]) -> String {
    let project = ProjectCoverage::from_files(files.iter());
    let dir = scoped_temp_dir("json_report").unwrap();
    let path = dir.path().join("report.json");
    JsonReportStrategy
        .generate(&path, &project, files, &AnalysisToggles::default(), None)
        .unwrap();
    std::fs::read_to_string(&path).unwrap()
}

#[test]
fn output_is_valid_json_with_expected_shape() {
    let rendered = generate(&sample_files());
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    assert_eq!(parsed["metadata"]["tool"], "dlogcover");
    assert_eq!(parsed["metadata"]["files_analyzed"], 2);
    assert_eq!(parsed["metadata"]["error_files"], 1);
    assert!(parsed["metadata"]["generated_at"].is_string());

    assert_eq!(parsed["overall"]["function"]["total"], 4);
    assert_eq!(parsed["overall"]["function"]["covered"], 3);
    assert!(parsed["overall"]["overall_ratio"].is_f64());
    assert!(parsed["files"].as_array().unwrap().len() == 2);
}

#[test]
fn uncovered_paths_are_objects_with_location() {
    let rendered = generate(&sample_files());
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();

    let uncovered = &parsed["files"][0]["uncovered"][0];
    assert_eq!(uncovered["metric"], "key path");
    assert_eq!(uncovered["kind"], "if branch");
    assert_eq!(uncovered["line"], 40);
    assert_eq!(uncovered["column"], 9);
    assert_eq!(uncovered["recommended_level"], "warning");
}

#[test]
fn error_files_carry_their_note() {
    let rendered = generate(&sample_files());
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed["files"][1]["error"], "syntax error");
    assert_eq!(parsed["files"][1]["function"]["total"], 0);
    assert_eq!(parsed["files"][1]["function"]["vacuous"], true);
}

#[test]
fn report_round_trips_through_serde() {
    // Serializing and re-parsing yields the same overall and per-file
    // numbers.
    let files = sample_files();
    let project = ProjectCoverage::from_files(files.iter());
    let report =
        JsonReportStrategy::build(&project, &files, &AnalysisToggles::default(), None);
    let rendered = serde_json::to_string(&report).unwrap();
    let back: JsonReport = serde_json::from_str(&rendered).unwrap();

    assert_eq!(back.overall.function.total, report.overall.function.total);
    assert_eq!(back.overall.function.covered, report.overall.function.covered);
    assert!((back.overall.overall_ratio - report.overall.overall_ratio).abs() < f64::EPSILON);
    assert_eq!(back.files.len(), report.files.len());
    for (a, b) in back.files.iter().zip(report.files.iter()) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.function.total, b.function.total);
        assert_eq!(a.branch.covered, b.branch.covered);
        assert!((a.overall_ratio - b.overall_ratio).abs() < f64::EPSILON);
    }
}

#[test]
fn ratios_reflect_vacuous_rule() {
    let rendered = generate(&sample_files());
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    // Exception metric counted nothing: ratio 1.0 and flagged vacuous.
    assert_eq!(parsed["overall"]["exception"]["ratio"], 1.0);
    assert_eq!(parsed["overall"]["exception"]["vacuous"], true);
}
