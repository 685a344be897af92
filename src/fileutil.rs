use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{DlogcoverError, Result};

/// Lists files under `root` that satisfy `predicate`.
///
/// Deterministic: entries are visited in lexicographic order within each
/// directory, directories pre-order. With `recursive` false only the
/// immediate children of `root` are considered.
///
/// # Errors
/// Returns an error if `root` does not exist or is not readable.
pub fn list_files(
    root: &Path,
    predicate: impl Fn(&Path) -> bool,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DlogcoverError::FileAccess {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "directory not found"),
        });
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let files = WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && predicate(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    Ok(files)
}

/// Lists files matching an optional glob pattern in addition to the
/// predicate. An empty pattern matches everything.
///
/// # Errors
/// Returns an error if `root` does not exist or is not readable.
pub fn list_files_matching(
    root: &Path,
    predicate: impl Fn(&Path) -> bool,
    glob: &str,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    if glob.is_empty() {
        return list_files(root, predicate, recursive);
    }
    let pattern = GlobPattern::new(glob);
    list_files(root, |p| pattern.matches(p) && predicate(p), recursive)
}

/// Reads a file into a byte vector.
///
/// # Errors
/// Returns a `FileAccess` error when the file cannot be opened or read.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| DlogcoverError::FileAccess {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reads a file into a string, replacing invalid UTF-8 sequences.
///
/// # Errors
/// Returns a `FileAccess` error when the file cannot be opened or read.
pub fn read_to_string(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a file through a buffered reader in fixed-size chunks. Slower
/// than the single-read path; kept as the fallback when IO optimization
/// is disabled.
///
/// # Errors
/// Returns a `FileAccess` error when the file cannot be opened or read.
pub fn read_to_string_buffered(path: &Path) -> Result<String> {
    use std::io::Read;

    let file = fs::File::open(path).map_err(|e| DlogcoverError::FileAccess {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DlogcoverError::FileAccess {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes `bytes` to `path`. With `create_parents` set, missing parent
/// directories are created first.
///
/// # Errors
/// Returns an IO error with path context on failure.
pub fn write_bytes(path: &Path, bytes: &[u8], create_parents: bool) -> Result<()> {
    if create_parents
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| DlogcoverError::io_with_context(e, parent.to_path_buf(), "mkdir"))?;
    }

    let mut file = fs::File::create(path)
        .map_err(|e| DlogcoverError::io_with_context(e, path.to_path_buf(), "create"))?;
    file.write_all(bytes)
        .map_err(|e| DlogcoverError::io_with_context(e, path.to_path_buf(), "write"))?;
    Ok(())
}

/// A temporary file removed on drop, on all exit paths.
///
/// Thin wrapper over `tempfile::NamedTempFile` that keeps the configured
/// prefix visible in the path for debuggability.
pub struct ScopedTempFile {
    inner: tempfile::NamedTempFile,
}

impl ScopedTempFile {
    /// Creates a new scoped temporary file with the given name prefix.
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be created.
    pub fn new(prefix: &str) -> Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(prefix)
            .tempfile()
            .map_err(DlogcoverError::from)?;
        Ok(Self { inner })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Writes content to the temporary file.
    ///
    /// # Errors
    /// Returns an IO error on write failure.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(DlogcoverError::from)
    }
}

/// Creates a temporary directory removed on drop.
///
/// # Errors
/// Returns an IO error when the directory cannot be created.
pub fn scoped_temp_dir(prefix: &str) -> Result<tempfile::TempDir> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .map_err(DlogcoverError::from)
}

/// Lexically normalizes a path: collapses `.` and `..` components and
/// unifies separators. Does not touch the filesystem; leading `..` on a
/// relative path is preserved.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let simplified = dunce::simplified(path);
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in simplified.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Computes `to` relative to `from`. Both inputs are normalized first; when
/// the paths share no common prefix, `to` is returned as-is.
#[must_use]
pub fn relative_to(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);

    let from_comps: Vec<_> = from.components().collect();
    let to_comps: Vec<_> = to.components().collect();

    let common = from_comps
        .iter()
        .zip(to_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && from.is_absolute() != to.is_absolute() {
        return to;
    }

    let mut out = PathBuf::new();
    for _ in common..from_comps.len() {
        out.push("..");
    }
    for comp in &to_comps[common..] {
        out.push(comp.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Translates a glob pattern to a regular expression: `*` becomes `.*`,
/// `?` becomes `.`, every other regex metacharacter is escaped.
#[must_use]
pub fn glob_to_regex(glob: &str) -> String {
    let mut regex = String::with_capacity(glob.len() * 2);
    for c in glob.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            '.' | '+' | '^' | '$' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex
}

/// A compiled exclude pattern. Globs are translated to regexes; when the
/// translated pattern fails to compile, matching degrades to plain
/// substring containment.
#[derive(Debug)]
pub struct GlobPattern {
    pattern: String,
    regex: Option<regex::Regex>,
}

impl GlobPattern {
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let translated = glob_to_regex(pattern);
        let regex = match regex::Regex::new(&translated) {
            Ok(r) => Some(r),
            Err(e) => {
                log::warn!("pattern '{pattern}' does not compile ({e}), using substring match");
                None
            }
        };
        Self {
            pattern: pattern.to_string(),
            regex,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Checks whether the pattern matches anywhere in `path`.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let text = path.to_string_lossy().replace('\\', "/");
        self.regex.as_ref().map_or_else(
            || text.contains(&self.pattern),
            |regex| regex.is_match(&text),
        )
    }
}

#[cfg(test)]
#[path = "fileutil_tests.rs"]
mod tests;
