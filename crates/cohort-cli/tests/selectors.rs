//! Integration tests for selectors and logging setup.

use std::str::FromStr;

use cohort_cli::logging::{LogConfig, LogFormat, init_logging};
use cohort_cli::selector::{TableSelector, VariableSelector};
use cohort_model::VariableKey;
use tracing::level_filters::LevelFilter;

#[test]
fn test_variable_selector_trims_segments() {
    let selector = VariableSelector::from_str(" ALPHA / demo / age ").unwrap();
    assert_eq!(selector.0, VariableKey::new("ALPHA", "demo", "age"));
}

#[test]
fn test_variable_selector_keeps_slashes_in_name() {
    let selector = VariableSelector::from_str("ALPHA/labs/ratio a/b").unwrap();
    assert_eq!(selector.0.variable_name, "ratio a/b");
    assert_eq!(selector.0.table_name, "labs");
}

#[test]
fn test_variable_selector_rejects_empty_segment() {
    let error = VariableSelector::from_str("ALPHA//age").unwrap_err();
    insta::assert_snapshot!(
        error.to_string(),
        @"invalid selector 'ALPHA//age': expected COHORT/TABLE/VARIABLE"
    );
}

#[test]
fn test_table_selector_round_trips_display() {
    let selector = TableSelector::from_str("BETA/vitals").unwrap();
    assert_eq!(selector.cohort, "BETA");
    assert_eq!(selector.to_string(), "BETA/vitals");
    assert!(TableSelector::from_str("BETA").is_err());
}

#[test]
fn test_init_logging_writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("explorer.log");
    let config = LogConfig {
        level_filter: LevelFilter::INFO,
        use_env_filter: false,
        with_ansi: false,
        format: LogFormat::Compact,
        log_file: Some(path.clone()),
        ..LogConfig::default()
    };
    init_logging(&config).unwrap();
    tracing::warn!(file = "BROKEN.csv", "file ingestion failed");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("file ingestion failed"));
    assert!(contents.contains("BROKEN.csv"));
}
