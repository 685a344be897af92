use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::analyzer::{CoverageCalculator, LogFunctionTable};
use crate::ast::AstCache;
use crate::compiledb::CompileDb;
use crate::config::LogFunctionsConfig;
use crate::language::Language;

fn source_file(relative: &str, content: &str) -> SourceFile {
    SourceFile {
        path: PathBuf::from("/project").join(relative),
        relative_path: PathBuf::from(relative),
        size: content.len() as u64,
        mtime: 1_700_000_000,
        content: content.to_string(),
        is_header: false,
        language: Language::Cpp,
    }
}

fn pipeline(options: PipelineOptions) -> Pipeline {
    let table = Arc::new(LogFunctionTable::from_config(&LogFunctionsConfig::default()));
    Pipeline::new(
        table,
        Arc::new(CoverageCalculator::default()),
        Arc::new(AstCache::default()),
        Arc::new(CompileDb::default()),
        options,
    )
}

fn sequential() -> PipelineOptions {
    PipelineOptions {
        parallel: false,
        ..PipelineOptions::default()
    }
}

const COVERED: &str = "void f() { qDebug() << \"hi\"; }";
const UNCOVERED: &str = "void g(int x) { if (x) { run(); } }";

#[test]
fn sequential_run_produces_per_file_stats() {
    let pipe = pipeline(sequential());
    let outcome = pipe
        .run(
            vec![source_file("a.cpp", COVERED), source_file("b.cpp", UNCOVERED)],
            None,
        )
        .unwrap();

    assert_eq!(outcome.files.len(), 2);
    assert_eq!(outcome.files[0].relative_path, PathBuf::from("a.cpp"));
    assert_eq!(outcome.files[0].functions.total, 1);
    assert_eq!(outcome.files[0].functions.covered, 1);
    assert_eq!(outcome.files[1].functions.covered, 0);
    assert_eq!(outcome.files[1].branches.total, 1);

    assert_eq!(outcome.project.files, 2);
    assert_eq!(outcome.project.functions.total, 2);
    assert_eq!(outcome.stats.files_processed, 2);
    assert_eq!(outcome.stats.functions_analyzed, 2);
    assert_eq!(outcome.stats.log_calls, 1);
}

#[test]
fn parallel_run_matches_sequential_counters() {
    let files: Vec<SourceFile> = (0..24)
        .map(|i| {
            let content = if i % 3 == 0 { COVERED } else { UNCOVERED };
            source_file(&format!("f{i:02}.cpp"), content)
        })
        .collect();

    let seq = pipeline(sequential()).run(files.clone(), None).unwrap();
    let par = pipeline(PipelineOptions {
        max_threads: 4,
        ..PipelineOptions::default()
    })
    .run(files, None)
    .unwrap();

    // The reduction is commutative and associative: any interleaving
    // yields identical final counters and identical file ordering.
    assert_eq!(par.project.functions, seq.project.functions);
    assert_eq!(par.project.branches, seq.project.branches);
    assert_eq!(par.files.len(), seq.files.len());
    for (p, s) in par.files.iter().zip(seq.files.iter()) {
        assert_eq!(p.relative_path, s.relative_path);
        assert_eq!(p.functions, s.functions);
        assert_eq!(p.branches, s.branches);
    }
}

#[test]
fn parse_errors_become_error_files() {
    let pipe = pipeline(sequential());
    let outcome = pipe
        .run(
            vec![
                source_file("ok.cpp", COVERED),
                source_file("bad.cpp", "void broken( {{{"),
            ],
            None,
        )
        .unwrap();

    let bad = outcome
        .files
        .iter()
        .find(|f| f.relative_path == Path::new("bad.cpp"))
        .expect("error file present");
    assert!(bad.error.is_some());
    assert_eq!(bad.functions.total, 0);

    assert_eq!(outcome.stats.errors, 1);
    assert_eq!(outcome.project.error_files, 1);
    // The healthy file still counts.
    assert_eq!(outcome.project.functions.total, 1);
}

#[test]
fn cache_hit_skips_reparse() {
    let pipe = pipeline(sequential());
    let files = vec![source_file("a.cpp", COVERED)];

    let first = pipe.run(files.clone(), None).unwrap();
    assert_eq!(first.stats.cache_hits, 0);

    let second = pipe.run(files, None).unwrap();
    assert_eq!(second.stats.cache_hits, 1);
    // Counters are identical to a cold parse.
    assert_eq!(second.project.functions, first.project.functions);
}

#[test]
fn modified_content_misses_cache() {
    let pipe = pipeline(sequential());
    pipe.run(vec![source_file("a.cpp", COVERED)], None).unwrap();

    let mut changed = source_file("a.cpp", "void f() {}");
    changed.mtime += 5;
    let outcome = pipe.run(vec![changed], None).unwrap();

    assert_eq!(outcome.stats.cache_hits, 0);
    assert_eq!(outcome.project.functions.covered, 0);
}

#[test]
fn disabled_cache_never_hits() {
    let pipe = pipeline(PipelineOptions {
        parallel: false,
        use_cache: false,
        ..PipelineOptions::default()
    });
    let files = vec![source_file("a.cpp", COVERED)];
    pipe.run(files.clone(), None).unwrap();
    let outcome = pipe.run(files, None).unwrap();
    assert_eq!(outcome.stats.cache_hits, 0);
}

#[test]
fn callback_fires_per_function() {
    let pipe = pipeline(sequential());
    let seen = AtomicUsize::new(0);
    let callback = |result: &FunctionResult| {
        assert!(!result.function_name.is_empty());
        seen.fetch_add(1, Ordering::SeqCst);
    };

    pipe.run(
        vec![
            source_file("a.cpp", "void a() {}\nvoid b() {}"),
            source_file("c.cpp", COVERED),
        ],
        Some(&callback),
    )
    .unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn decompose_orders_complex_functions_first() {
    let pipe = pipeline(sequential());
    let complex_first = std::sync::Mutex::new(Vec::new());
    let callback = |result: &FunctionResult| {
        complex_first.lock().unwrap().push(result.function_name.clone());
    };

    let source = "
void trivial() {}
void complex(int x) {
    if (x) { a(); } else { b(); }
    for (int i = 0; i < x; ++i) { c(i); }
}
";
    pipe.run(vec![source_file("m.cpp", source)], Some(&callback))
        .unwrap();

    let order = complex_first.into_inner().unwrap();
    assert_eq!(order, vec!["complex", "trivial"]);
}

#[test]
fn stop_flag_halts_between_files() {
    let pipe = pipeline(sequential());
    pipe.request_stop();
    let outcome = pipe
        .run(vec![source_file("a.cpp", COVERED)], None)
        .unwrap();
    assert!(outcome.files.is_empty());
    assert_eq!(outcome.stats.files_processed, 0);
}

#[test]
fn files_without_functions_still_appear() {
    let pipe = pipeline(sequential());
    let outcome = pipe
        .run(vec![source_file("empty.h", "#define FLAG 1\n")], None)
        .unwrap();
    assert_eq!(outcome.files.len(), 1);
    assert!(outcome.files[0].functions.is_vacuous());
    assert!(outcome.files[0].error.is_none());
}

#[test]
fn tiny_queue_capacity_still_completes() {
    // Capacity 1 forces producers to block on every send; the run must
    // still drain completely with identical results.
    let files: Vec<SourceFile> = (0..12)
        .map(|i| source_file(&format!("q{i}.cpp"), COVERED))
        .collect();

    let constrained = pipeline(PipelineOptions {
        max_threads: 4,
        queue_capacity: 1,
        ..PipelineOptions::default()
    })
    .run(files.clone(), None)
    .unwrap();
    let reference = pipeline(sequential()).run(files, None).unwrap();

    assert_eq!(constrained.project.functions, reference.project.functions);
    assert_eq!(constrained.files.len(), reference.files.len());
}

#[test]
fn empty_input_yields_empty_outcome() {
    let pipe = pipeline(sequential());
    let outcome = pipe.run(Vec::new(), None).unwrap();
    assert!(outcome.files.is_empty());
    assert_eq!(outcome.project.files, 0);
    assert_eq!(outcome.stats.files_processed, 0);
}
