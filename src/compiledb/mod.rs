use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{DlogcoverError, Result};
use crate::fileutil;

/// Compiler arguments applied when a file has no compile-database entry.
const HEURISTIC_FLAGS: &[&str] = &["-std=c++17"];

/// Filesystem entries that mark a repository root for the project-include
/// walk.
const ROOT_MARKERS: &[&str] = &[".git", "compile_commands.json", "CMakeLists.txt"];

/// Normalized compile information for one translation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileInfo {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub command: String,
    pub include_paths: Vec<PathBuf>,
    pub defines: Vec<String>,
    pub flags: Vec<String>,
}

impl CompileInfo {
    /// Renders the normalized info back into a compiler argument list.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for include in &self.include_paths {
            args.push(format!("-I{}", include.display()));
        }
        for define in &self.defines {
            args.push(format!("-D{define}"));
        }
        args.extend(self.flags.iter().cloned());
        args
    }
}

/// One raw record of a compile_commands.json database.
#[derive(Debug, Deserialize)]
struct DbRecord {
    directory: String,
    file: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

/// Parsed compile-commands database with per-file argument lookup.
#[derive(Debug, Default)]
pub struct CompileDb {
    entries: BTreeMap<PathBuf, CompileInfo>,
}

impl CompileDb {
    /// Loads and parses a compile_commands.json file.
    ///
    /// # Errors
    /// `DbMissing` when the file does not exist, `DbMalformed` when it is
    /// not a valid record array.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DlogcoverError::DbMissing(path.to_path_buf()));
        }
        let content = fileutil::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses database content.
    ///
    /// # Errors
    /// `DbMalformed` when the content is not a valid record array.
    pub fn parse(content: &str) -> Result<Self> {
        let records: Vec<DbRecord> = serde_json::from_str(content)
            .map_err(|e| DlogcoverError::DbMalformed(e.to_string()))?;

        let mut entries = BTreeMap::new();
        for record in records {
            let directory = PathBuf::from(&record.directory);
            let file = canonical_key(&directory, Path::new(&record.file));

            let (command, args) = match (&record.command, &record.arguments) {
                (_, Some(arguments)) => (arguments.join(" "), arguments.clone()),
                (Some(command), None) => (command.clone(), tokenize_command(command)),
                (None, None) => {
                    log::warn!(
                        "compile database record for {} has neither command nor arguments",
                        record.file
                    );
                    continue;
                }
            };

            let mut info = CompileInfo {
                directory,
                file: file.clone(),
                command,
                ..CompileInfo::default()
            };
            classify_args(&args, &mut info);
            entries.insert(file, info);
        }

        Ok(Self { entries })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All files known to the database, in canonical-path order.
    #[must_use]
    pub fn files(&self) -> Vec<&Path> {
        self.entries.keys().map(PathBuf::as_path).collect()
    }

    /// Looks up the stored compile info for a file.
    ///
    /// # Errors
    /// `FileUnknown` when the file has no database entry.
    pub fn info_for(&self, file: &Path) -> Result<&CompileInfo> {
        let key = canonical_key(Path::new("."), file);
        self.entries
            .get(&key)
            .or_else(|| self.entries.get(file))
            .ok_or_else(|| DlogcoverError::FileUnknown(file.to_path_buf()))
    }

    /// Returns compiler arguments for a file: the stored entry when present,
    /// heuristic defaults otherwise. Never fails; the degrade is logged.
    #[must_use]
    pub fn args_for(&self, file: &Path) -> Vec<String> {
        match self.info_for(file) {
            Ok(info) => info.to_args(),
            Err(_) => {
                log::debug!(
                    "no compile database entry for {}, using heuristic arguments",
                    file.display()
                );
                let mut args: Vec<String> =
                    HEURISTIC_FLAGS.iter().map(ToString::to_string).collect();
                for include in project_includes(file) {
                    args.push(format!("-I{}", include.display()));
                }
                args
            }
        }
    }
}

fn canonical_key(directory: &Path, file: &Path) -> PathBuf {
    let joined = if file.is_absolute() {
        file.to_path_buf()
    } else {
        directory.join(file)
    };
    dunce::canonicalize(&joined).unwrap_or_else(|_| fileutil::normalize(&joined))
}

/// Splits a shell command line into arguments, honoring single quotes,
/// double quotes and backslash escapes.
#[must_use]
pub fn tokenize_command(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut has_token = false;

    let mut chars = command.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                has_token = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_token = true;
            }
            '\\' if !in_single => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                    has_token = true;
                }
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

/// Classifies tokenized compiler arguments into include paths, defines and
/// remaining flags. The first token (the compiler itself) and the source
/// file argument are dropped.
fn classify_args(args: &[String], info: &mut CompileInfo) {
    let mut iter = args.iter().skip(1).peekable();
    while let Some(arg) = iter.next() {
        if let Some(dir) = arg.strip_prefix("-I") {
            let dir = if dir.is_empty() {
                iter.next().map(String::as_str).unwrap_or_default()
            } else {
                dir
            };
            if !dir.is_empty() {
                info.include_paths.push(resolve_include(&info.directory, dir));
            }
        } else if arg == "-isystem" {
            if let Some(dir) = iter.next() {
                info.include_paths.push(resolve_include(&info.directory, dir));
            }
        } else if let Some(def) = arg.strip_prefix("-D") {
            let def = if def.is_empty() {
                iter.next().map(String::as_str).unwrap_or_default()
            } else {
                def
            };
            if !def.is_empty() {
                info.defines.push(def.to_string());
            }
        } else if arg == "-c" || arg == "-o" {
            // Skip the compile/output markers and the output operand.
            if arg == "-o" {
                iter.next();
            }
        } else if Path::new(arg)
            .extension()
            .is_some_and(|e| matches!(e.to_str(), Some("c" | "cc" | "cpp" | "cxx")))
        {
            // The source file operand is carried in `file` already.
        } else {
            info.flags.push(arg.clone());
        }
    }
}

fn resolve_include(directory: &Path, dir: &str) -> PathBuf {
    let path = Path::new(dir);
    if path.is_absolute() {
        fileutil::normalize(path)
    } else {
        fileutil::normalize(&directory.join(path))
    }
}

/// Detects compiler-provided system include directories by running the
/// system compiler in preprocess-verbose mode and parsing its search list.
/// Failures degrade to an empty list.
#[must_use]
pub fn system_includes() -> Vec<PathBuf> {
    let compiler = std::env::var("CXX").unwrap_or_default();
    let candidates: Vec<&str> = if compiler.is_empty() {
        vec!["clang++", "g++"]
    } else {
        vec![compiler.as_str()]
    };

    for compiler in candidates {
        let output = Command::new(compiler)
            .args(["-E", "-v", "-x", "c++", "/dev/null"])
            .output();
        if let Ok(output) = output {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let includes = parse_search_list(&stderr);
            if !includes.is_empty() {
                return includes;
            }
        }
    }
    log::debug!("could not detect system include directories");
    Vec::new()
}

/// Parses the `#include <...> search starts here:` block of a compiler's
/// verbose preprocessor output.
#[must_use]
pub fn parse_search_list(output: &str) -> Vec<PathBuf> {
    let mut includes = Vec::new();
    let mut in_block = false;
    for line in output.lines() {
        if line.starts_with("#include <...> search starts here:") {
            in_block = true;
            continue;
        }
        if line.starts_with("End of search list.") {
            break;
        }
        if in_block {
            let dir = line.trim();
            // Framework annotations trail the path on macOS.
            let dir = dir.split(" (").next().unwrap_or(dir);
            if !dir.is_empty() {
                includes.push(PathBuf::from(dir));
            }
        }
    }
    includes
}

/// Walks up from `file`'s directory collecting `include` and `src` child
/// directories, stopping at the first ancestor carrying a repository root
/// marker.
#[must_use]
pub fn project_includes(file: &Path) -> Vec<PathBuf> {
    let mut includes = Vec::new();
    let start = if file.is_dir() {
        file
    } else {
        file.parent().unwrap_or(file)
    };

    for ancestor in start.ancestors() {
        for name in ["include", "src"] {
            let candidate = ancestor.join(name);
            if candidate.is_dir() && !includes.contains(&candidate) {
                includes.push(candidate);
            }
        }
        let is_root = ROOT_MARKERS.iter().any(|m| ancestor.join(m).exists());
        if is_root {
            break;
        }
    }
    includes
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
