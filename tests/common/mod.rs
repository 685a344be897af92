#![allow(dead_code)]

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Creates an `assert_cmd` Command for the dlogcover binary.
#[macro_export]
macro_rules! dlogcover {
    () => {
        assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("dlogcover"))
    };
}

/// Temporary project tree for integration tests.
pub struct TestFixture {
    pub dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Creates a file with the given content, creating parents on demand.
    pub fn create_file(&self, relative_path: &str, content: &str) {
        let path = self.dir.path().join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write file");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a dlogcover.json config file at the fixture root.
    pub fn create_config(&self, content: &str) {
        self.create_file("dlogcover.json", content);
    }

    /// Runs the binary over this fixture with a JSON report and returns
    /// the parsed report.
    pub fn analyze_json(&self, extra_args: &[&str]) -> serde_json::Value {
        let report_path = self.dir.path().join("report.json");
        let mut cmd = crate::dlogcover!();
        cmd.current_dir(self.path())
            .arg("-d")
            .arg(self.path())
            .arg("-f")
            .arg("json")
            .arg("-o")
            .arg(&report_path)
            .arg("-q");
        for arg in extra_args {
            cmd.arg(arg);
        }
        cmd.assert().success();

        let content = fs::read_to_string(&report_path).expect("report written");
        serde_json::from_str(&content).expect("valid JSON report")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for reading a metric object out of a report.
pub fn metric<'a>(report: &'a serde_json::Value, scope: &str, name: &str) -> &'a serde_json::Value {
    &report[scope][name]
}
