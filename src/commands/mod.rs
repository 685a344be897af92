mod analyze;

pub use analyze::{run_analyze, run_analyze_impl};
