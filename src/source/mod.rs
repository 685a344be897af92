use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::config::ScanConfig;
use crate::error::Result;
use crate::fileutil::{self, GlobPattern};
use crate::language::Language;

/// One discovered source file. Created during collection, read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Normalized absolute path.
    pub path: PathBuf,
    /// Path relative to the scan root that produced it.
    pub relative_path: PathBuf,
    pub size: u64,
    /// Modification time, seconds since the epoch.
    pub mtime: u64,
    pub content: String,
    pub is_header: bool,
    pub language: Language,
}

/// Discovers and owns the source files of a run.
///
/// Retains each path whose extension is configured and which no exclude
/// pattern matches; duplicate logical paths collapse to the first
/// occurrence. The file list is populated once and read-only afterwards.
#[derive(Debug)]
pub struct SourceManager {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    excludes: Vec<GlobPattern>,
    io_optimized: bool,
    files: Vec<SourceFile>,
    index: HashMap<PathBuf, usize>,
}

impl SourceManager {
    #[must_use]
    pub fn new(scan: &ScanConfig) -> Self {
        Self::with_roots(scan, scan.directories.iter().map(PathBuf::from).collect())
    }

    /// Builds a manager scanning `roots` with the extension and exclude
    /// configuration of `scan`.
    #[must_use]
    pub fn with_roots(scan: &ScanConfig, roots: Vec<PathBuf>) -> Self {
        let extensions = scan
            .file_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        let excludes = scan
            .exclude_patterns
            .iter()
            .map(|p| GlobPattern::new(p))
            .collect();
        Self {
            roots,
            extensions,
            excludes,
            io_optimized: true,
            files: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Disables the single-read IO path in favor of buffered chunk reads.
    #[must_use]
    pub const fn with_io_optimization(mut self, enabled: bool) -> Self {
        self.io_optimized = enabled;
        self
    }

    /// Scans every configured root recursively and reads the retained
    /// files. Returns the number of collected files.
    ///
    /// Per-file read failures are logged and skipped; a missing scan root
    /// is an error.
    ///
    /// # Errors
    /// Returns an error when a scan root cannot be listed.
    pub fn collect(&mut self) -> Result<usize> {
        self.files.clear();
        self.index.clear();

        let roots = self.roots.clone();
        for root in &roots {
            let root = dunce::canonicalize(root).unwrap_or_else(|_| fileutil::normalize(root));
            let candidates = fileutil::list_files(
                &root,
                |path| self.is_supported(path) && !self.is_excluded(path),
                true,
            )?;
            log::info!("found {} candidate files under {}", candidates.len(), root.display());

            for path in candidates {
                self.add_file(&root, &path);
            }
        }

        log::info!("collected {} source files", self.files.len());
        Ok(self.files.len())
    }

    fn add_file(&mut self, root: &Path, path: &Path) {
        let normalized = fileutil::normalize(path);
        if self.index.contains_key(&normalized) {
            return;
        }

        let metadata = match std::fs::metadata(&normalized) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("cannot stat {}: {e}, skipping", normalized.display());
                return;
            }
        };
        let read = if self.io_optimized {
            fileutil::read_to_string
        } else {
            fileutil::read_to_string_buffered
        };
        let content = match read(&normalized) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("cannot read {}: {}, skipping", normalized.display(), e.message());
                return;
            }
        };

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());

        let file = SourceFile {
            relative_path: fileutil::relative_to(root, &normalized),
            size: metadata.len(),
            mtime,
            is_header: Language::is_header_extension(&normalized),
            language: Language::detect(&normalized, &content),
            path: normalized.clone(),
            content,
        };
        self.index.insert(normalized, self.files.len());
        self.files.push(file);
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excludes.iter().any(|pattern| pattern.matches(path))
    }

    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// O(1) lookup by normalized absolute path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&SourceFile> {
        let normalized = fileutil::normalize(path);
        self.index.get(&normalized).map(|&i| &self.files[i])
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
