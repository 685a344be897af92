use super::*;

#[test]
fn format_parses_case_insensitively() {
    assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
    assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
    assert!("xml".parse::<ReportFormat>().is_err());
}

#[test]
fn registry_serves_registered_strategies() {
    let registry = ReporterRegistry::default();
    assert_eq!(registry.strategy_for(ReportFormat::Text).name(), "TEXT");
    assert_eq!(registry.strategy_for(ReportFormat::Json).name(), "JSON");
    assert_eq!(registry.strategy_for(ReportFormat::Json).extension(), ".json");
    assert_eq!(registry.supported_formats().len(), 2);
}

#[test]
fn unregistered_format_falls_back_to_text() {
    // Build a registry carrying only the text strategy; asking for JSON
    // must serve text instead of failing.
    let mut registry = ReporterRegistry {
        strategies: indexmap::IndexMap::new(),
    };
    registry.register(Box::new(TextReportStrategy));

    let strategy = registry.strategy_for(ReportFormat::Json);
    assert_eq!(strategy.format(), ReportFormat::Text);
}

#[test]
fn progress_bar_proportions() {
    assert_eq!(progress_bar(1.0, 10), "██████████");
    assert_eq!(progress_bar(0.0, 10), "░░░░░░░░░░");
    assert_eq!(progress_bar(0.5, 10), "█████░░░░░");
    // Out-of-range input clamps instead of overflowing the bar.
    assert_eq!(progress_bar(1.5, 4), "████");
}
