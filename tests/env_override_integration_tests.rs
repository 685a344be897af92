//! Precedence of the DLOGCOVER_* environment overlay: config < env < CLI.

mod common;

use common::TestFixture;

fn covered_source() -> &'static str {
    "void f() { qDebug() << \"hi\"; }\n"
}

#[test]
fn env_format_overrides_config_file() {
    let fixture = TestFixture::new();
    fixture.create_config(r#"{ "version": "1.0", "report": { "format": "text" } }"#);
    fixture.create_file("a.cpp", covered_source());
    let report_path = fixture.path().join("out");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_REPORT_FORMAT", "json")
        .args(["-d", ".", "-q", "-o"])
        .arg(&report_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&report_path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&content).is_ok());
}

#[test]
fn cli_format_overrides_environment() {
    let fixture = TestFixture::new();
    fixture.create_file("a.cpp", covered_source());
    let report_path = fixture.path().join("out");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_REPORT_FORMAT", "json")
        .args(["-d", ".", "-f", "text", "-q", "-o"])
        .arg(&report_path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("DLogCover Coverage Report"));
}

#[test]
fn env_directory_selects_scan_root() {
    let fixture = TestFixture::new();
    fixture.create_file("outer.cpp", covered_source());
    fixture.create_file("inner/only.cpp", covered_source());
    let report_path = fixture.path().join("report.json");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_DIRECTORY", fixture.path().join("inner"))
        .args(["-f", "json", "-q", "-o"])
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "only.cpp");
}

#[test]
fn env_exclude_extends_config_patterns() {
    let fixture = TestFixture::new();
    fixture.create_file("src/keep.cpp", covered_source());
    fixture.create_file("generated/skip.cpp", covered_source());
    let report_path = fixture.path().join("report.json");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_EXCLUDE", "generated/*")
        .args(["-d", ".", "-f", "json", "-q", "-o"])
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "src/keep.cpp");
}

#[test]
fn env_output_is_used_when_no_cli_flag() {
    let fixture = TestFixture::new();
    fixture.create_file("a.cpp", covered_source());
    let report_path = fixture.path().join("from_env.txt");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_OUTPUT", &report_path)
        .args(["-d", ".", "-q"])
        .assert()
        .success();

    assert!(report_path.exists());
}

#[test]
fn log_path_flag_writes_tool_log() {
    let fixture = TestFixture::new();
    fixture.create_file("a.cpp", covered_source());
    let report_path = fixture.path().join("report.txt");
    let log_path = fixture.path().join("tool.log");

    dlogcover!()
        .current_dir(fixture.path())
        .args(["-d", ".", "-q", "-p"])
        .arg(&log_path)
        .arg("-o")
        .arg(&report_path)
        .assert()
        .success();

    assert!(log_path.exists());
}

#[test]
fn env_config_selects_config_file() {
    let fixture = TestFixture::new();
    fixture.create_file(
        "conf/custom.json",
        r#"{ "version": "1.0", "scan": { "file_extensions": ["cxx"] } }"#,
    );
    fixture.create_file("a.cpp", covered_source());
    fixture.create_file("b.cxx", covered_source());
    let report_path = fixture.path().join("report.json");

    dlogcover!()
        .current_dir(fixture.path())
        .env("DLOGCOVER_CONFIG", fixture.path().join("conf/custom.json"))
        .args(["-d", ".", "-f", "json", "-q", "-o"])
        .arg(&report_path)
        .assert()
        .success();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "b.cxx");
}
