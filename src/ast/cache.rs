use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use super::node::AstNode;

/// Default number of cached translation units.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default memory cap for cached trees.
pub const DEFAULT_MAX_MEMORY: usize = 512 * 1024 * 1024;

/// Computes the SHA-256 content hash used for cache validation.
#[must_use]
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    mtime: u64,
    size: u64,
    content_hash: String,
    ast: AstNode,
    access_count: u64,
    last_access: u64,
    memory: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<PathBuf, CacheEntry>,
    seq: u64,
    memory: usize,
}

impl CacheInner {
    fn evict_lru(&mut self, debug: bool) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_access)
            .map(|(path, _)| path.clone());
        self.remove_victim(victim, "lru", debug);
    }

    fn evict_largest(&mut self, debug: bool) {
        let victim = self
            .entries
            .iter()
            .max_by_key(|(_, e)| e.memory)
            .map(|(path, _)| path.clone());
        self.remove_victim(victim, "memory", debug);
    }

    fn remove_victim(&mut self, victim: Option<PathBuf>, reason: &str, debug: bool) {
        if let Some(path) = victim
            && let Some(entry) = self.entries.remove(&path)
        {
            self.memory = self.memory.saturating_sub(entry.memory);
            if debug {
                log::debug!(
                    "cache evicted {} ({reason}, {} bytes, {} accesses)",
                    path.display(),
                    entry.memory,
                    entry.access_count
                );
            }
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory: usize,
}

impl CacheStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Human-readable one-line summary for verbose output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "cache: {} entries, {} bytes, {} hits / {} misses ({:.1}% hit rate)",
            self.entries,
            self.memory,
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

/// Thread-safe AST cache keyed by absolute path.
///
/// An entry is valid only when size, mtime and content hash all match the
/// file's current state; any mismatch drops the stale entry and reports a
/// miss. Reads hand out deep clones so stored trees stay immutable.
/// Cache operations never surface errors: an internal inconsistency
/// flushes the cache and counts as a miss.
#[derive(Debug)]
pub struct AstCache {
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
    max_entries: usize,
    max_memory: usize,
    debug_mode: bool,
}

impl Default for AstCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_MEMORY)
    }
}

impl AstCache {
    #[must_use]
    pub fn new(max_entries: usize, max_memory: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            max_entries: max_entries.max(1),
            max_memory,
            debug_mode: false,
        }
    }

    #[must_use]
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Looks up a cached tree for `path`, validating against the file's
    /// current mtime, size and content hash.
    #[must_use]
    pub fn lookup(&self, path: &Path, mtime: u64, size: u64, content_hash: &str) -> Option<AstNode> {
        let mut inner = self.lock_or_flush()?;

        let valid = inner.entries.get(path).is_some_and(|entry| {
            entry.mtime == mtime && entry.size == size && entry.content_hash == content_hash
        });

        if valid {
            inner.seq += 1;
            let seq = inner.seq;
            let entry = inner.entries.get_mut(path)?;
            entry.access_count += 1;
            entry.last_access = seq;
            let ast = entry.ast.clone();
            drop(inner);
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(ast);
        }

        if inner.entries.contains_key(path) {
            if self.debug_mode {
                log::debug!("cache entry for {} is stale, dropping", path.display());
            }
            let stale = Some(path.to_path_buf());
            inner.remove_victim(stale, "stale", false);
        }
        drop(inner);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a tree, evicting by LRU past the entry cap and then by
    /// largest memory past the byte cap.
    pub fn insert(&self, path: &Path, mtime: u64, size: u64, content_hash: String, ast: AstNode) {
        let memory = ast.estimated_memory();
        let Some(mut inner) = self.lock_or_flush() else {
            return;
        };

        inner.seq += 1;
        let seq = inner.seq;
        let entry = CacheEntry {
            mtime,
            size,
            content_hash,
            ast,
            access_count: 1,
            last_access: seq,
            memory,
        };
        if let Some(old) = inner.entries.insert(path.to_path_buf(), entry) {
            inner.memory = inner.memory.saturating_sub(old.memory);
        }
        inner.memory += memory;

        while inner.entries.len() > self.max_entries {
            inner.evict_lru(self.debug_mode);
        }
        while inner.memory > self.max_memory && inner.entries.len() > 1 {
            inner.evict_largest(self.debug_mode);
        }
    }

    /// Drops every entry. Counters survive.
    pub fn clear(&self) {
        if let Some(mut inner) = self.lock_or_flush() {
            inner.entries.clear();
            inner.memory = 0;
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (entries, memory) = self
            .lock_or_flush()
            .map_or((0, 0), |inner| (inner.entries.len(), inner.memory));
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            memory,
        }
    }

    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Locks the map. A poisoned lock means a panic mid-update; the cache
    /// is flushed and treated as empty rather than surfacing an error.
    fn lock_or_flush(&self) -> Option<std::sync::MutexGuard<'_, CacheInner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(poisoned) => {
                log::warn!("AST cache lock poisoned, flushing");
                let mut guard = poisoned.into_inner();
                guard.entries.clear();
                guard.memory = 0;
                Some(guard)
            }
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
