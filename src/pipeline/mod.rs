use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam::channel::bounded;

use crate::analyzer::{
    CoverageCalculator, FileCoverage, FunctionCounters, LogCall, LogFunctionTable,
    ProjectCoverage,
};
use crate::ast::{AstBuilder, AstCache, AstNode, cache::hash_content, parse_translation_unit};
use crate::compiledb::CompileDb;
use crate::error::Result;
use crate::pool::WorkStealingPool;
use crate::source::SourceFile;

/// Default bound of every stage queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Execution options for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker budget; 0 selects the hardware concurrency.
    pub max_threads: usize,
    /// False forces the sequential path regardless of `max_threads`.
    pub parallel: bool,
    pub queue_capacity: usize,
    pub use_cache: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_threads: 0,
            parallel: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            use_cache: true,
        }
    }
}

/// Output of the parse stage.
#[derive(Debug)]
struct ParsedUnit {
    path: PathBuf,
    relative_path: PathBuf,
    tree: Option<AstNode>,
    error: Option<String>,
}

/// One function to analyze, tagged with an estimated complexity
/// (statement count) and a priority derived from it: complex functions
/// first, trivial ones last.
#[derive(Debug, Clone)]
pub struct FunctionTask {
    pub function_name: String,
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub subtree: AstNode,
    pub complexity: usize,
    pub priority: i64,
}

/// Result of analyzing one function.
#[derive(Debug, Clone)]
pub struct FunctionResult {
    pub function_name: String,
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub counters: FunctionCounters,
    pub log_calls: Vec<LogCall>,
}

enum AnalyzeMsg {
    File {
        relative_path: PathBuf,
        error: Option<String>,
    },
    Task(FunctionTask),
}

enum ResultMsg {
    File {
        relative_path: PathBuf,
        error: Option<String>,
    },
    Function(Box<FunctionResult>),
}

#[derive(Debug, Default)]
struct StageStats {
    files_processed: AtomicUsize,
    errors: AtomicUsize,
    cache_hits: AtomicUsize,
    functions_analyzed: AtomicUsize,
    log_calls: AtomicUsize,
    parse_micros: AtomicU64,
    parsed_files: AtomicUsize,
    unit_queue_depth: AtomicUsize,
    task_queue_depth: AtomicUsize,
}

/// Snapshot of per-stage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    pub files_processed: usize,
    pub errors: usize,
    pub cache_hits: usize,
    pub functions_analyzed: usize,
    pub log_calls: usize,
    pub avg_parse_ms: f64,
    pub unit_queue_depth: usize,
    pub task_queue_depth: usize,
}

impl PipelineStats {
    /// Human-readable one-line summary for verbose output.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "pipeline: {} files ({} errors, {} cache hits), {} functions, {} log calls, {:.2} ms avg parse",
            self.files_processed,
            self.errors,
            self.cache_hits,
            self.functions_analyzed,
            self.log_calls,
            self.avg_parse_ms
        )
    }
}

/// Aggregated outcome of a run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Per-file coverage ordered by relative path.
    pub files: Vec<FileCoverage>,
    pub project: ProjectCoverage,
    pub stats: PipelineStats,
}

/// Per-completed-function callback.
pub type FunctionCallback<'a> = &'a dyn Fn(&FunctionResult);

/// The parse → decompose → analyze pipeline.
///
/// Stage workers are long-lived tasks on a work-stealing pool, connected
/// by bounded channels: producers block on `send` when a stage queue is
/// full. Cancellation is cooperative: the stop flag is observed between
/// items, in-flight items run to completion and the queues drain before
/// the workers exit.
pub struct Pipeline {
    table: Arc<LogFunctionTable>,
    calculator: Arc<CoverageCalculator>,
    cache: Arc<AstCache>,
    compile_db: Arc<CompileDb>,
    options: PipelineOptions,
    stats: Arc<StageStats>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        table: Arc<LogFunctionTable>,
        calculator: Arc<CoverageCalculator>,
        cache: Arc<AstCache>,
        compile_db: Arc<CompileDb>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            table,
            calculator,
            cache,
            compile_db,
            options,
            stats: Arc::new(StageStats::default()),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests cooperative cancellation; observed between items.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        let parsed = self.stats.parsed_files.load(Ordering::Relaxed);
        let micros = self.stats.parse_micros.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let avg_parse_ms = if parsed == 0 {
            0.0
        } else {
            micros as f64 / parsed as f64 / 1000.0
        };
        PipelineStats {
            files_processed: self.stats.files_processed.load(Ordering::Relaxed),
            errors: self.stats.errors.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            functions_analyzed: self.stats.functions_analyzed.load(Ordering::Relaxed),
            log_calls: self.stats.log_calls.load(Ordering::Relaxed),
            avg_parse_ms,
            unit_queue_depth: self.stats.unit_queue_depth.load(Ordering::Relaxed),
            task_queue_depth: self.stats.task_queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Runs the pipeline over `files` and reduces every function result
    /// into per-file and project statistics.
    ///
    /// The reduction is commutative and associative, so any worker
    /// interleaving yields identical final counters; the per-file list is
    /// ordered by relative path.
    ///
    /// # Errors
    /// Returns an error only on pool misuse; per-file problems are
    /// recorded in the outcome instead.
    pub fn run(
        &self,
        files: Vec<SourceFile>,
        on_function: Option<FunctionCallback<'_>>,
    ) -> Result<PipelineOutcome> {
        let threads = if self.options.max_threads == 0 {
            num_cpus::get()
        } else {
            self.options.max_threads
        };

        if !self.options.parallel || threads <= 1 || files.len() <= 1 {
            return Ok(self.run_sequential(files, on_function));
        }
        self.run_parallel(files, threads, on_function)
    }

    fn run_sequential(
        &self,
        files: Vec<SourceFile>,
        on_function: Option<FunctionCallback<'_>>,
    ) -> PipelineOutcome {
        let shared = self.shared_ref();
        let mut results = Vec::new();
        for file in files {
            if self.is_stopped() {
                break;
            }
            let unit = shared.process_file(&file);
            let (relative_path, error, tasks) = shared.decompose_unit(unit);
            results.push(ResultMsg::File {
                relative_path,
                error,
            });
            for task in tasks {
                let result = shared.analyze_task(task);
                results.push(ResultMsg::Function(Box::new(result)));
            }
        }
        self.gather(results.into_iter(), on_function)
    }

    #[allow(clippy::too_many_lines)]
    fn run_parallel(
        &self,
        files: Vec<SourceFile>,
        threads: usize,
        on_function: Option<FunctionCallback<'_>>,
    ) -> Result<PipelineOutcome> {
        // Every stage loop occupies one pool worker for the whole run, so
        // the pool is sized to hold all of them: a feeder, the parse
        // workers, one decompose worker and the analyze workers.
        let budget = threads.clamp(2, 62).saturating_sub(2).max(2);
        let parse_workers = (budget * 2 / 3).max(1);
        let analyze_workers = (budget - parse_workers).max(1);
        let pool = WorkStealingPool::new(parse_workers + analyze_workers + 2);
        log::debug!(
            "pipeline: {parse_workers} parse workers, {analyze_workers} analyze workers"
        );

        let capacity = self.options.queue_capacity.max(1);
        let (file_tx, file_rx) = bounded::<SourceFile>(capacity);
        let (unit_tx, unit_rx) = bounded::<ParsedUnit>(capacity);
        let (task_tx, task_rx) = bounded::<AnalyzeMsg>(capacity);
        let (result_tx, result_rx) = bounded::<ResultMsg>(capacity);

        let this = self.shared();

        // Feeder.
        {
            let this = Arc::clone(&this);
            pool.submit(move || {
                for file in files {
                    if this.stop.load(Ordering::Acquire) {
                        break;
                    }
                    if file_tx.send(file).is_err() {
                        break;
                    }
                }
            })?;
        }

        // Parse stage.
        for _ in 0..parse_workers {
            let this = Arc::clone(&this);
            let file_rx = file_rx.clone();
            let unit_tx = unit_tx.clone();
            pool.submit(move || {
                while let Ok(file) = file_rx.recv() {
                    if this.stop.load(Ordering::Acquire) {
                        continue; // drain without processing
                    }
                    let unit = this.process_file(&file);
                    this.stats
                        .unit_queue_depth
                        .store(unit_tx.len(), Ordering::Relaxed);
                    if unit_tx.send(unit).is_err() {
                        break;
                    }
                }
            })?;
        }
        drop(file_rx);
        drop(unit_tx);

        // Decompose stage.
        {
            let this = Arc::clone(&this);
            pool.submit(move || {
                while let Ok(unit) = unit_rx.recv() {
                    if this.stop.load(Ordering::Acquire) {
                        continue;
                    }
                    let (relative_path, error, tasks) = this.decompose_unit(unit);
                    let marker = AnalyzeMsg::File {
                        relative_path,
                        error,
                    };
                    if task_tx.send(marker).is_err() {
                        break;
                    }
                    for task in tasks {
                        this.stats
                            .task_queue_depth
                            .store(task_tx.len(), Ordering::Relaxed);
                        if task_tx.send(AnalyzeMsg::Task(task)).is_err() {
                            break;
                        }
                    }
                }
            })?;
        }

        // Analyze stage.
        for _ in 0..analyze_workers {
            let this = Arc::clone(&this);
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            pool.submit(move || {
                while let Ok(msg) = task_rx.recv() {
                    let out = match msg {
                        AnalyzeMsg::File {
                            relative_path,
                            error,
                        } => ResultMsg::File {
                            relative_path,
                            error,
                        },
                        AnalyzeMsg::Task(task) => {
                            if this.stop.load(Ordering::Acquire) {
                                continue;
                            }
                            ResultMsg::Function(Box::new(this.analyze_task(task)))
                        }
                    };
                    if result_tx.send(out).is_err() {
                        break;
                    }
                }
            })?;
        }
        drop(task_rx);
        drop(result_tx);

        // Result funnel on the caller thread.
        let outcome = self.gather(result_rx.into_iter(), on_function);
        pool.shutdown();
        Ok(outcome)
    }

    /// Clones the shareable interior for stage tasks.
    fn shared(&self) -> Arc<PipelineShared> {
        Arc::new(self.shared_ref())
    }

    fn shared_ref(&self) -> PipelineShared {
        PipelineShared {
            table: Arc::clone(&self.table),
            calculator: Arc::clone(&self.calculator),
            cache: Arc::clone(&self.cache),
            compile_db: Arc::clone(&self.compile_db),
            use_cache: self.options.use_cache,
            stats: Arc::clone(&self.stats),
            stop: Arc::clone(&self.stop),
        }
    }

    fn gather(
        &self,
        results: impl Iterator<Item = ResultMsg>,
        on_function: Option<FunctionCallback<'_>>,
    ) -> PipelineOutcome {
        use std::collections::BTreeMap;

        struct FileAccumulator {
            counters: FunctionCounters,
            error: Option<String>,
        }

        let mut by_file: BTreeMap<PathBuf, FileAccumulator> = BTreeMap::new();
        for msg in results {
            match msg {
                ResultMsg::File {
                    relative_path,
                    error,
                } => {
                    let entry = by_file.entry(relative_path).or_insert(FileAccumulator {
                        counters: FunctionCounters::default(),
                        error: None,
                    });
                    entry.error = error;
                }
                ResultMsg::Function(result) => {
                    if let Some(callback) = on_function {
                        callback(&result);
                    }
                    let entry = by_file
                        .entry(result.relative_path.clone())
                        .or_insert(FileAccumulator {
                            counters: FunctionCounters::default(),
                            error: None,
                        });
                    entry.counters.merge(result.counters);
                }
            }
        }

        let files: Vec<FileCoverage> = by_file
            .into_iter()
            .map(|(relative_path, acc)| match acc.error {
                Some(note) => FileCoverage::error_file(relative_path, note),
                None => FileCoverage::from_counters(relative_path, acc.counters),
            })
            .collect();
        let project = ProjectCoverage::from_files(files.iter());

        PipelineOutcome {
            project,
            files,
            stats: self.stats(),
        }
    }
}

/// The interior shared with stage tasks (all handles are `Arc`s).
struct PipelineShared {
    table: Arc<LogFunctionTable>,
    calculator: Arc<CoverageCalculator>,
    cache: Arc<AstCache>,
    compile_db: Arc<CompileDb>,
    use_cache: bool,
    stats: Arc<StageStats>,
    stop: Arc<AtomicBool>,
}

impl PipelineShared {
    /// Parse stage: consult the cache, parse and build the trimmed tree on
    /// a miss, record the error note on failure.
    fn process_file(&self, file: &SourceFile) -> ParsedUnit {
        self.stats.files_processed.fetch_add(1, Ordering::Relaxed);

        let hash = hash_content(&file.content);
        if self.use_cache
            && let Some(tree) = self.cache.lookup(&file.path, file.mtime, file.size, &hash)
        {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return ParsedUnit {
                path: file.path.clone(),
                relative_path: file.relative_path.clone(),
                tree: Some(tree),
                error: None,
            };
        }

        let args = self.compile_db.args_for(&file.path);
        let started = Instant::now();
        let parsed = parse_translation_unit(&file.path, &file.content, &args, file.language);
        #[allow(clippy::cast_possible_truncation)]
        let elapsed = started.elapsed().as_micros() as u64;
        self.stats.parse_micros.fetch_add(elapsed, Ordering::Relaxed);
        self.stats.parsed_files.fetch_add(1, Ordering::Relaxed);

        match parsed {
            Ok(tree) => {
                let root = AstBuilder::new(&file.content, self.table.names()).build(&tree);
                if self.use_cache {
                    self.cache
                        .insert(&file.path, file.mtime, file.size, hash, root.clone());
                }
                ParsedUnit {
                    path: file.path.clone(),
                    relative_path: file.relative_path.clone(),
                    tree: Some(root),
                    error: None,
                }
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                log::warn!("parse failed: {}", e.message());
                ParsedUnit {
                    path: file.path.clone(),
                    relative_path: file.relative_path.clone(),
                    tree: None,
                    error: Some(e.message()),
                }
            }
        }
    }

    /// Decompose stage: one task per top-level function, complex functions
    /// first.
    fn decompose_unit(&self, unit: ParsedUnit) -> (PathBuf, Option<String>, Vec<FunctionTask>) {
        let mut tasks = Vec::new();
        if let Some(tree) = unit.tree {
            collect_functions(&tree, &unit.path, &unit.relative_path, &mut tasks);
            tasks.sort_by_key(|task| std::cmp::Reverse(task.priority));
        }
        (unit.relative_path, unit.error, tasks)
    }

    /// Analyze stage: run the log identifier and the coverage fold over
    /// one function subtree.
    fn analyze_task(&self, task: FunctionTask) -> FunctionResult {
        let log_calls = self.table.identify(&task.subtree);
        let counters = self.calculator.analyze_function(&task.subtree);

        self.stats.functions_analyzed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .log_calls
            .fetch_add(log_calls.len(), Ordering::Relaxed);

        FunctionResult {
            function_name: task.function_name,
            path: task.path,
            relative_path: task.relative_path,
            counters,
            log_calls,
        }
    }
}

fn collect_functions(
    node: &AstNode,
    path: &std::path::Path,
    relative_path: &std::path::Path,
    tasks: &mut Vec<FunctionTask>,
) {
    if node.kind.is_function() {
        let complexity = node.subtree_size();
        #[allow(clippy::cast_possible_wrap)]
        let priority = complexity as i64;
        tasks.push(FunctionTask {
            function_name: node.name.clone(),
            path: path.to_path_buf(),
            relative_path: relative_path.to_path_buf(),
            subtree: node.clone(),
            complexity,
            priority,
        });
        return;
    }
    for child in &node.children {
        collect_functions(child, path, relative_path, tasks);
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
