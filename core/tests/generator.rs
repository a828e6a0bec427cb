//! Synthetic snapshot generator.

use riskfeed_core::{
    generator::{self, GeneratorConfig},
    ingest::{self, read_table},
    model::{RawPayment, RawTransaction},
    parse,
};
use std::collections::HashSet;

#[test]
fn row_counts_follow_config() {
    let config = GeneratorConfig::default_test();
    let raw = generator::generate(&config);
    let dups = (config.duplicate_rate * config.n_transactions as f64) as usize;
    assert_eq!(raw.customers.len(), config.n_customers);
    assert_eq!(raw.transactions.len(), config.n_transactions + dups);
    assert_eq!(raw.payments.len(), raw.transactions.len(), "one payment row per transaction row");
}

#[test]
fn generated_snapshot_validates_cleanly() {
    let raw = generator::generate(&GeneratorConfig::default_test());
    let validated = ingest::validate(&raw).expect("generated data must validate");
    assert_eq!(validated.coerced_fields, 0);
}

#[test]
fn duplicates_repeat_existing_transactions() {
    let config = GeneratorConfig::default_test();
    let raw = generator::generate(&config);
    let originals: HashSet<&RawTransaction> = raw.transactions[..config.n_transactions].iter().collect();
    for dup in &raw.transactions[config.n_transactions..] {
        assert!(originals.contains(dup), "duplicate {} not found among originals", dup.txn_id);
    }
}

#[test]
fn values_stay_within_configured_ranges() {
    let config = GeneratorConfig::default_test();
    let raw = generator::generate(&config);
    let validated = ingest::validate(&raw).unwrap();

    for t in &validated.transactions {
        let d = t.txn_date.expect("txn_date always set");
        assert!(d >= config.start_date && d <= config.end_date);
        let due_days = (t.due_date.unwrap() - d).num_days();
        assert!((config.min_due_days..=config.max_due_days).contains(&due_days));
        assert!(t.amount > 0.0);
        assert!((1..=config.n_customers as i64).contains(&t.customer_id));
    }
    let unpaid = validated.payments.iter().filter(|p| p.payment_date.is_none()).count();
    assert!(unpaid > 0, "some payments must be missing");
    for p in validated.payments.iter().filter(|p| p.payment_date.is_some()) {
        assert!(p.paid_amount.is_some(), "paid rows carry an amount");
    }
}

#[test]
fn written_files_read_back_as_raw_rows() {
    let dir = tempfile::tempdir().unwrap();
    let raw = generator::generate(&GeneratorConfig::default_test());
    generator::write_tables(&raw, dir.path()).unwrap();

    let payments: Vec<RawPayment> = read_table(&dir.path().join("payments.csv")).unwrap();
    assert_eq!(payments, raw.payments);
    let unpaid = payments.iter().find(|p| p.payment_date.is_empty()).expect("an unpaid row");
    assert_eq!(parse::parse_date(&unpaid.payment_date), Ok(None));
}
