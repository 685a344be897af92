use std::path::Path;

use super::*;
use crate::ast::node::{Location, NodeKind};

fn tree(name: &str, text_bytes: usize) -> AstNode {
    let mut root = AstNode::new(NodeKind::Function, name, Location::new(1, 1));
    root.text = "x".repeat(text_bytes);
    root
}

#[test]
fn hit_requires_matching_metadata_and_hash() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let hash = hash_content("void f() {}");
    cache.insert(Path::new("/a.cpp"), 100, 11, hash.clone(), tree("f", 8));

    assert!(cache.lookup(Path::new("/a.cpp"), 100, 11, &hash).is_some());
    assert_eq!(cache.hit_count(), 1);
    assert_eq!(cache.miss_count(), 0);
}

#[test]
fn mtime_size_or_hash_mismatch_invalidates() {
    let paths = [
        (101, 11, hash_content("void f() {}")),  // mtime changed
        (100, 12, hash_content("void f() {}")),  // size changed
        (100, 11, hash_content("void g() {}")),  // content changed
    ];
    for (mtime, size, probe_hash) in paths {
        let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
        let stored = hash_content("void f() {}");
        cache.insert(Path::new("/a.cpp"), 100, 11, stored.clone(), tree("f", 8));

        assert!(cache.lookup(Path::new("/a.cpp"), mtime, size, &probe_hash).is_none());
        assert_eq!(cache.miss_count(), 1);
        // The stale entry is dropped; a matching probe now also misses.
        assert!(cache.lookup(Path::new("/a.cpp"), 100, 11, &stored).is_none());
    }
}

#[test]
fn invalidation_does_not_disturb_other_entries() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let hash_a = hash_content("a");
    let hash_b = hash_content("b");
    cache.insert(Path::new("/a.cpp"), 1, 1, hash_a, tree("a", 8));
    cache.insert(Path::new("/b.cpp"), 2, 1, hash_b.clone(), tree("b", 8));

    assert!(cache.lookup(Path::new("/a.cpp"), 9, 9, "other").is_none());
    assert!(cache.lookup(Path::new("/b.cpp"), 2, 1, &hash_b).is_some());
}

#[test]
fn lookup_returns_deep_clone() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let hash = hash_content("src");
    cache.insert(Path::new("/a.cpp"), 1, 3, hash.clone(), tree("f", 8));

    let mut first = cache.lookup(Path::new("/a.cpp"), 1, 3, &hash).unwrap();
    first.name.clear();
    first.has_logging = true;

    let second = cache.lookup(Path::new("/a.cpp"), 1, 3, &hash).unwrap();
    assert_eq!(second.name, "f");
    assert!(!second.has_logging);
}

#[test]
fn lru_eviction_past_entry_cap() {
    let cache = AstCache::new(2, DEFAULT_MAX_MEMORY);
    let hash = hash_content("x");
    cache.insert(Path::new("/a.cpp"), 1, 1, hash.clone(), tree("a", 8));
    cache.insert(Path::new("/b.cpp"), 1, 1, hash.clone(), tree("b", 8));

    // Touch /a.cpp so /b.cpp becomes least recently used.
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 1, &hash).is_some());
    cache.insert(Path::new("/c.cpp"), 1, 1, hash.clone(), tree("c", 8));

    assert_eq!(cache.stats().entries, 2);
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 1, &hash).is_some());
    assert!(cache.lookup(Path::new("/b.cpp"), 1, 1, &hash).is_none());
    assert!(cache.lookup(Path::new("/c.cpp"), 1, 1, &hash).is_some());
}

#[test]
fn memory_pressure_evicts_largest_entries() {
    // Budget fits the two small trees but not the large one as well.
    let small = tree("s", 64).estimated_memory();
    let cache = AstCache::new(100, small * 3);
    let hash = hash_content("x");

    cache.insert(Path::new("/small1.cpp"), 1, 1, hash.clone(), tree("s", 64));
    cache.insert(Path::new("/small2.cpp"), 1, 1, hash.clone(), tree("s", 64));
    cache.insert(Path::new("/large.cpp"), 1, 1, hash.clone(), tree("l", 4096));

    assert!(cache.lookup(Path::new("/large.cpp"), 1, 1, &hash).is_none());
    assert!(cache.lookup(Path::new("/small1.cpp"), 1, 1, &hash).is_some());
    assert!(cache.lookup(Path::new("/small2.cpp"), 1, 1, &hash).is_some());
}

#[test]
fn reinserting_a_path_replaces_the_entry() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let old_hash = hash_content("old");
    let new_hash = hash_content("new");
    cache.insert(Path::new("/a.cpp"), 1, 3, old_hash.clone(), tree("old", 8));
    cache.insert(Path::new("/a.cpp"), 2, 3, new_hash.clone(), tree("new", 8));

    assert_eq!(cache.stats().entries, 1);
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 3, &old_hash).is_none());
    assert!(cache.lookup(Path::new("/a.cpp"), 2, 3, &new_hash).is_some());
}

#[test]
fn clear_drops_entries_but_keeps_counters() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let hash = hash_content("x");
    cache.insert(Path::new("/a.cpp"), 1, 1, hash.clone(), tree("a", 8));
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 1, &hash).is_some());

    cache.clear();
    let stats = cache.stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.memory, 0);
    assert_eq!(stats.hits, 1);
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 1, &hash).is_none());
}

#[test]
fn hit_rate_and_summary() {
    let cache = AstCache::new(10, DEFAULT_MAX_MEMORY);
    let hash = hash_content("x");
    cache.insert(Path::new("/a.cpp"), 1, 1, hash.clone(), tree("a", 8));
    assert!(cache.lookup(Path::new("/a.cpp"), 1, 1, &hash).is_some());
    assert!(cache.lookup(Path::new("/b.cpp"), 1, 1, &hash).is_none());

    let stats = cache.stats();
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    assert!(stats.summary().contains("1 hits / 1 misses"));
}

#[test]
fn same_content_hash_is_deterministic() {
    assert_eq!(hash_content("abc"), hash_content("abc"));
    assert_ne!(hash_content("abc"), hash_content("abd"));
    assert_eq!(hash_content("").len(), 64);
}
