mod loader;
mod model;

pub use loader::{DEFAULT_CONFIG_FILE, apply_env_overrides, load_config, parse_config};
pub use model::{
    AnalysisConfig, CONFIG_VERSION, Config, CustomLogConfig, LogFunctionsConfig, OutputConfig,
    QtLogConfig, ReportConfig, ScanConfig,
};
