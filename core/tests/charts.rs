//! Chart datasets and figure files.

use riskfeed_core::{
    charts::{self, ChartSet, DELAY_BINS},
    config::RiskThresholds,
    generator::{self, GeneratorConfig},
    pipeline,
    risk::RiskLevel,
    table::AnalysisTable,
};

fn table() -> AnalysisTable {
    let raw = generator::generate(&GeneratorConfig::default_test());
    pipeline::run(&raw, &RiskThresholds::default()).unwrap().table
}

#[test]
fn risk_distribution_lists_levels_in_severity_order() {
    let table = table();
    let set = ChartSet::build(&table);
    let labels: Vec<&str> = set.risk_distribution.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Low", "Medium", "High"]);
    let total: usize = set.risk_distribution.iter().map(|c| c.count).sum();
    assert_eq!(total, table.len());
}

#[test]
fn delay_histogram_counts_every_row() {
    let table = table();
    let set = ChartSet::build(&table);
    assert_eq!(set.delay_histogram.len(), DELAY_BINS);
    let total: usize = set.delay_histogram.iter().map(|b| b.count).sum();
    assert_eq!(total, table.len());
    let min = table.iter().map(|r| r.delay_days).min().unwrap() as f64;
    assert_eq!(set.delay_histogram[0].start, min);
}

#[test]
fn box_stats_are_ordered_within_each_level() {
    let set = ChartSet::build(&table());
    assert!(!set.amount_by_risk.is_empty());
    for b in &set.amount_by_risk {
        assert!(
            b.min <= b.q1 && b.q1 <= b.median && b.median <= b.q3 && b.q3 <= b.max,
            "{:?} summary out of order: {b:?}",
            b.risk_level
        );
    }
    let high = set.amount_by_risk.iter().find(|b| b.risk_level == RiskLevel::High);
    if let Some(high) = high {
        assert!(high.count > 0);
    }
}

#[test]
fn empty_table_yields_empty_datasets() {
    let set = ChartSet::build(&AnalysisTable::default());
    assert!(set.delay_histogram.is_empty());
    assert!(set.amount_by_risk.is_empty());
    assert!(set.risk_distribution.iter().all(|c| c.count == 0));
}

#[test]
fn figures_are_written_as_json_files() {
    let dir = tempfile::tempdir().unwrap();
    let figures = dir.path().join("figures");
    let files = charts::write_figures(&ChartSet::build(&table()), &figures).unwrap();
    assert_eq!(files.len(), 6);
    for f in &files {
        let body = std::fs::read_to_string(f).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
        assert!(value.is_array(), "{} is not a JSON array", f.display());
    }
    assert!(files[0].ends_with("01_risk_distribution.json"));
}
