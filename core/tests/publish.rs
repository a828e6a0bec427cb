//! Atomic publication of the Analysis Table.

use riskfeed_core::{
    config::RiskThresholds,
    error::PipelineError,
    generator::{self, GeneratorConfig},
    pipeline,
    sink::{CsvFileSink, TableSink},
    table::AnalysisTable,
};

fn table(seed: u64) -> AnalysisTable {
    let raw = generator::generate(&GeneratorConfig {
        seed,
        n_transactions: 50,
        ..GeneratorConfig::default_test()
    });
    pipeline::run(&raw, &RiskThresholds::default()).unwrap().table
}

#[test]
fn publish_replaces_previous_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    let mut sink = CsvFileSink::new(&path);

    sink.publish(&table(1)).unwrap();
    let second = table(2);
    sink.publish(&second).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), second.to_csv_bytes().unwrap());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n.to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

#[test]
fn publish_creates_missing_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("analysis_table.csv");
    CsvFileSink::new(&path).publish(&table(3)).unwrap();
    assert!(path.exists());
}

#[test]
fn publish_to_bare_file_name_uses_current_directory() {
    let dir = tempfile::tempdir().unwrap();
    let name = format!("analysis_table_{}.csv", std::process::id());
    let relative = std::path::Path::new(&name);
    let table = table(4);

    // Relative target with no parent component; the published file must
    // land next to the process's working directory.
    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let result = CsvFileSink::new(relative).publish(&table);
    std::env::set_current_dir(previous).unwrap();

    result.unwrap();
    assert_eq!(
        std::fs::read(dir.path().join(&name)).unwrap(),
        table.to_csv_bytes().unwrap()
    );
}

#[test]
fn failed_publish_leaves_previous_file_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    let first = table(1);
    CsvFileSink::new(&path).publish(&first).unwrap();
    let before = std::fs::read(&path).unwrap();

    // A directory cannot be renamed over, so the final step fails.
    let blocked = dir.path().join("blocked");
    std::fs::create_dir_all(blocked.join("inner")).unwrap();
    let err = CsvFileSink::new(&blocked).publish(&table(2)).unwrap_err();
    assert!(matches!(err, PipelineError::Publish { .. }), "got {err}");

    assert_eq!(std::fs::read(&path).unwrap(), before, "previous table was modified");
    let leftovers = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0, "temp file not cleaned up");
}
