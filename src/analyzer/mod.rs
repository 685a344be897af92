pub mod coverage;
pub mod identifier;

pub use coverage::{
    AnalysisToggles, CoverageCalculator, FileCoverage, FunctionCounters, MetricKind, MetricStats,
    ProjectCoverage, UncoveredSite,
};
pub use identifier::{CallStyle, LogCall, LogFunctionTable, LogLevel, LogType};
