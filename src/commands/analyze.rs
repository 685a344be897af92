use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

use crate::analyzer::{CoverageCalculator, LogFunctionTable};
use crate::ast::AstCache;
use crate::ast::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_MEMORY};
use crate::cli::Cli;
use crate::compiledb::CompileDb;
use crate::config::{self, Config};
use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineOptions, PipelineOutcome};
use crate::report::{ReportFormat, ReporterRegistry};
use crate::source::SourceManager;
use crate::{EXIT_ERROR, EXIT_SUCCESS};

/// Runs the analysis and report generation, mapping errors to the exit
/// code contract: 0 on success, 1 on any error.
#[must_use]
pub fn run_analyze(cli: &Cli) -> i32 {
    match run_analyze_impl(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.error_type(), e.message());
            if let Some(hint) = e.suggestion() {
                eprintln!("Hint: {hint}");
            }
            EXIT_ERROR
        }
    }
}

/// Internal implementation returning errors for the wrapper to render.
///
/// # Errors
/// Returns fatal errors only (config, logger, report); per-file problems
/// are degraded into the report per the error policy.
pub fn run_analyze_impl(cli: &Cli) -> Result<i32> {
    // 1. Configuration: file < environment < CLI.
    let config_path = resolve_config_path(cli);
    let mut config = config::load_config(config_path.as_deref())?;
    apply_cli_overrides(&mut config, cli);

    // 2. Process-wide logger.
    let level = config
        .output
        .log_level
        .parse()
        .unwrap_or(crate::analyzer::LogLevel::Info);
    let log_file = config.output.log_file.as_ref().map(PathBuf::from);
    crate::logging::init(level, cli.quiet, cli.verbose, log_file.as_deref())?;

    // 3. Shared read-only analysis state.
    let table = Arc::new(LogFunctionTable::from_config(&config.log_functions));
    let calculator = Arc::new(CoverageCalculator::new(
        config.error_keywords(),
        config.toggles(),
    ));
    let cache = Arc::new(
        AstCache::new(
            cli.max_cache_size.unwrap_or(DEFAULT_MAX_ENTRIES),
            DEFAULT_MAX_MEMORY,
        )
        .with_debug(cli.verbose),
    );
    let compile_db = Arc::new(load_compile_db(&config));

    // 4. Source discovery.
    let mut manager =
        SourceManager::new(&config.scan).with_io_optimization(!cli.disable_io_opt);
    let count = manager.collect()?;
    if count == 0 {
        log::warn!("no source files matched the configured extensions and excludes");
    }

    // 5. Pipeline run with a progress spinner.
    let pipeline = Pipeline::new(
        table,
        calculator,
        Arc::clone(&cache),
        compile_db,
        PipelineOptions {
            max_threads: cli.max_threads.unwrap_or(0),
            parallel: !cli.disable_parallel,
            use_cache: !cli.disable_cache,
            ..PipelineOptions::default()
        },
    );

    let spinner = make_spinner(cli.quiet);
    let on_function = |result: &crate::pipeline::FunctionResult| {
        if let Some(ref bar) = spinner {
            bar.set_message(result.function_name.clone());
            bar.inc(1);
        }
    };
    let outcome = pipeline.run(manager.files().to_vec(), Some(&on_function))?;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    if cli.verbose {
        log::info!("{}", outcome.stats.summary());
        log::info!("{}", cache.stats().summary());
    }

    // 6. Report emission.
    let format = resolve_format(&config, cli);
    let registry = ReporterRegistry::default();
    let strategy = registry.strategy_for(format);
    let output_path = resolve_output_path(&config, cli, strategy.extension());
    strategy.generate(
        &output_path,
        &outcome.project,
        &outcome.files,
        &config.toggles(),
        None,
    )?;

    print_summary(cli, &config, &outcome, &output_path);
    Ok(EXIT_SUCCESS)
}

fn resolve_config_path(cli: &Cli) -> Option<PathBuf> {
    if cli.config.is_some() {
        return cli.config.clone();
    }
    std::env::var("DLOGCOVER_CONFIG")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// CLI arguments override both the config file and the environment.
fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ref directory) = cli.directory {
        config.scan.directories = vec![directory.to_string_lossy().into_owned()];
    }
    if let Some(ref output) = cli.output {
        config.output.report_file = Some(output.to_string_lossy().into_owned());
    }
    config.scan.exclude_patterns.extend(cli.exclude.iter().cloned());
    if let Some(level) = cli.log_level {
        config.output.log_level = crate::analyzer::LogLevel::from(level).to_string();
    }
    if let Some(format) = cli.format {
        config.report.format = crate::report::ReportFormat::from(format).to_string();
    }
    if let Some(ref log_path) = cli.log_path {
        config.output.log_file = Some(log_path.to_string_lossy().into_owned());
    }
    for include in &cli.include_path {
        config
            .scan
            .compiler_args
            .push(format!("-I{}", include.display()));
    }
}

/// Loads the compile database from the scan root, degrading to heuristic
/// arguments when none is usable.
fn load_compile_db(config: &Config) -> CompileDb {
    let root = config
        .scan
        .directories
        .first()
        .map_or_else(|| PathBuf::from("."), PathBuf::from);

    for candidate in [
        root.join("compile_commands.json"),
        root.join("build/compile_commands.json"),
    ] {
        match CompileDb::load(&candidate) {
            Ok(db) => {
                log::info!(
                    "loaded compile database with {} entries from {}",
                    db.len(),
                    candidate.display()
                );
                return db;
            }
            Err(e) => {
                log::debug!("compile database unavailable at {}: {}", candidate.display(), e.message());
            }
        }
    }
    log::info!("no compile database found, using heuristic compiler arguments");
    CompileDb::default()
}

fn resolve_format(config: &Config, cli: &Cli) -> ReportFormat {
    cli.format.map_or_else(
        || config.report.format.parse().unwrap_or_default(),
        ReportFormat::from,
    )
}

fn resolve_output_path(config: &Config, cli: &Cli, extension: &str) -> PathBuf {
    if let Some(ref output) = cli.output {
        return output.clone();
    }
    if let Some(ref output) = config.output.report_file {
        return PathBuf::from(output);
    }
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("dlogcover_report_{timestamp}{extension}"))
}

fn make_spinner(quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {pos} functions analyzed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    Some(bar)
}

fn print_summary(cli: &Cli, config: &Config, outcome: &PipelineOutcome, output_path: &Path) {
    if cli.quiet {
        return;
    }
    let overall = outcome.project.overall(&config.toggles());
    println!(
        "Analyzed {} files ({} with errors): overall coverage {:.1}%",
        outcome.project.files,
        outcome.project.error_files,
        overall * 100.0
    );
    println!("Report written to {}", output_path.display());
}

#[cfg(test)]
#[path = "analyze_tests.rs"]
mod tests;
