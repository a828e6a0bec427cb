//! Checksum-keyed table cache.

use riskfeed_core::{
    cache::{Checksum, TableCache},
    config::RiskThresholds,
    generator::{self, GeneratorConfig},
    pipeline,
    sink::{CsvFileSink, TableSink},
};
use std::sync::Arc;

fn publish(path: &std::path::Path, seed: u64) {
    let raw = generator::generate(&GeneratorConfig {
        seed,
        n_transactions: 40,
        ..GeneratorConfig::default_test()
    });
    let table = pipeline::run(&raw, &RiskThresholds::default()).unwrap().table;
    CsvFileSink::new(path).publish(&table).unwrap();
}

#[test]
fn unchanged_file_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    publish(&path, 1);

    let mut cache = TableCache::new();
    let a = cache.load(&path).unwrap();
    let b = cache.load(&path).unwrap();
    assert!(Arc::ptr_eq(&a, &b), "second load must reuse the parsed table");
    assert_eq!(cache.loads(), 1);
    assert_eq!(cache.hits(), 1);
}

#[test]
fn republished_file_is_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    publish(&path, 1);

    let mut cache = TableCache::new();
    let a = cache.load(&path).unwrap();
    let first_sum = cache.checksum();
    publish(&path, 2);
    let b = cache.load(&path).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(cache.checksum(), first_sum);
    assert_eq!(cache.loads(), 2);
}

#[test]
fn invalidate_forces_a_reparse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    publish(&path, 1);

    let mut cache = TableCache::new();
    cache.load(&path).unwrap();
    cache.invalidate();
    cache.load(&path).unwrap();
    assert_eq!(cache.loads(), 2);
    assert_eq!(cache.hits(), 0);
}

#[test]
fn checksum_renders_as_lowercase_hex() {
    let sum = Checksum::of(b"abc");
    assert_eq!(
        sum.to_string(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}
