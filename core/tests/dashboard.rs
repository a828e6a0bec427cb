//! Dashboard filtering and panel datasets.

use chrono::NaiveDate;
use riskfeed_core::{
    config::RiskThresholds,
    dashboard::{apply_filter, filter_options, Dashboard, DashboardFilter, DashboardOutcome, FilteredView},
    error::PipelineError,
    model::{RawCustomer, RawPayment, RawTables, RawTransaction},
    pipeline,
    risk::RiskLevel,
    sink::{CsvFileSink, TableSink},
    table::AnalysisTable,
};
use std::collections::BTreeSet;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Four rows:
///   1  A Retail    120000  2024-01-05  paid +5   High
///   2  A Retail      1000  2024-02-10  unpaid    Low
///   3  B Services   60000  2024-02-15  paid -2   Medium
///   4  B Services     500  (no date)   paid +35  High
fn fixture() -> AnalysisTable {
    let customer = |id: &str, name: &str, sector: &str| RawCustomer {
        customer_id: id.into(),
        customer_name: name.into(),
        sector: sector.into(),
        country: "PL".into(),
    };
    let txn = |id: &str, cid: &str, amount: &str, txn_date: &str, due: &str| RawTransaction {
        txn_id: id.into(),
        customer_id: cid.into(),
        txn_date: txn_date.into(),
        txn_type: "SALE".into(),
        amount: amount.into(),
        currency: "PLN".into(),
        due_date: due.into(),
    };
    let pay = |id: &str, tid: &str, d: &str| RawPayment {
        payment_id: id.into(),
        txn_id: tid.into(),
        payment_date: d.into(),
        paid_amount: "1".into(),
    };
    let raw = RawTables {
        customers: vec![customer("1", "A", "Retail"), customer("2", "B", "Services")],
        transactions: vec![
            txn("1", "1", "120000", "2024-01-05", "2024-01-20"),
            txn("2", "1", "1000", "2024-02-10", "2024-02-20"),
            txn("3", "2", "60000", "2024-02-15", "2024-03-01"),
            txn("4", "2", "500", "", "2024-03-01"),
        ],
        payments: vec![
            pay("1", "1", "2024-01-25"),
            pay("2", "3", "2024-02-28"),
            pay("3", "4", "2024-04-05"),
        ],
    };
    pipeline::run(&raw, &RiskThresholds::default()).unwrap().table
}

fn ready<'a>(table: &'a AnalysisTable, filter: &DashboardFilter) -> FilteredView<'a> {
    match apply_filter(table, filter).expect("valid filter") {
        DashboardOutcome::Ready(view) => view,
        DashboardOutcome::Empty { message } => panic!("unexpected empty view: {message}"),
    }
}

fn ids(view: &FilteredView<'_>) -> Vec<i64> {
    view.rows().iter().map(|r| r.txn_id).collect()
}

#[test]
fn unfiltered_summary_covers_every_row() {
    let table = fixture();
    let s = ready(&table, &DashboardFilter::default()).summary();
    assert_eq!(s.total_transactions, 4);
    assert_eq!(s.total_amount, 181_500.0);
    assert_eq!(s.avg_delay_days, 9.5);
    assert_eq!(s.high_risk_count, 2);
    assert_eq!(s.high_risk_ratio_pct, 50.0);
    assert_eq!(s.paid_rate_pct, 75.0);
    assert_eq!(s.late_rate_pct, 50.0, "late means delay_days > 0");
}

#[test]
fn filters_combine_with_and() {
    let table = fixture();
    let high = DashboardFilter {
        risk_levels: Some(BTreeSet::from([RiskLevel::High])),
        ..DashboardFilter::default()
    };
    assert_eq!(ids(&ready(&table, &high)), vec![1, 4]);

    let high_retail = DashboardFilter {
        sectors: Some(BTreeSet::from(["Retail".to_string()])),
        ..high
    };
    assert_eq!(ids(&ready(&table, &high_retail)), vec![1]);
}

#[test]
fn date_range_is_inclusive_and_skips_undated_rows() {
    let table = fixture();
    let feb = DashboardFilter {
        date_range: Some((date("2024-02-10"), date("2024-02-15"))),
        ..DashboardFilter::default()
    };
    assert_eq!(ids(&ready(&table, &feb)), vec![2, 3]);
}

#[test]
fn no_match_is_empty_not_an_error() {
    let table = fixture();
    let mining = DashboardFilter {
        sectors: Some(BTreeSet::from(["Mining".to_string()])),
        ..DashboardFilter::default()
    };
    match apply_filter(&table, &mining).expect("empty result is not an error") {
        DashboardOutcome::Empty { message } => assert!(!message.is_empty()),
        DashboardOutcome::Ready(view) => panic!("expected empty view, got {} rows", view.len()),
    }
}

#[test]
fn inverted_date_range_is_rejected() {
    let table = fixture();
    let inverted = DashboardFilter {
        date_range: Some((date("2024-03-01"), date("2024-01-01"))),
        ..DashboardFilter::default()
    };
    let err = apply_filter(&table, &inverted).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidDateRange { .. }), "got {err}");
}

#[test]
fn listing_is_newest_first_with_undated_rows_last() {
    let table = fixture();
    let view = ready(&table, &DashboardFilter::default());
    let order: Vec<i64> = view.rows_by_date_desc().iter().map(|r| r.txn_id).collect();
    assert_eq!(order, vec![3, 2, 1, 4]);
}

#[test]
fn panels_aggregate_the_filtered_rows() {
    let table = fixture();
    let view = ready(&table, &DashboardFilter::default());

    let top: Vec<(String, usize)> = view
        .top_high_risk_customers()
        .into_iter()
        .map(|c| (c.label, c.count))
        .collect();
    assert_eq!(top, vec![("A".to_string(), 1), ("B".to_string(), 1)]);

    let monthly: Vec<(String, f64)> = view.monthly_amount().into_iter().map(|m| (m.month, m.value)).collect();
    assert_eq!(
        monthly,
        vec![("2024-01".to_string(), 120_000.0), ("2024-02".to_string(), 61_000.0)]
    );

    let pivot = view.sector_risk_pivot();
    assert_eq!(pivot.len(), 2);
    assert_eq!((pivot[0].sector.as_str(), pivot[0].low, pivot[0].medium, pivot[0].high), ("Retail", 1, 0, 1));
    assert_eq!((pivot[1].sector.as_str(), pivot[1].low, pivot[1].medium, pivot[1].high), ("Services", 0, 1, 1));
}

#[test]
fn export_uses_table_encoding_in_listing_order() {
    let table = fixture();
    let high = DashboardFilter {
        risk_levels: Some(BTreeSet::from([RiskLevel::High])),
        ..DashboardFilter::default()
    };
    let bytes = ready(&table, &high).to_csv_bytes().unwrap();
    let exported = AnalysisTable::read_csv(bytes.as_slice()).expect("export reads back as a table");
    let order: Vec<i64> = exported.iter().map(|r| r.txn_id).collect();
    assert_eq!(order, vec![1, 4]);
    assert!(String::from_utf8(bytes).unwrap().starts_with("txn_id,customer_id,"));
}

#[test]
fn options_list_sorted_sectors_and_date_bounds() {
    let table = fixture();
    let opts = filter_options(&table);
    assert_eq!(opts.sectors, vec!["Retail", "Services"]);
    assert_eq!(opts.min_date, Some(date("2024-01-05")));
    assert_eq!(opts.max_date, Some(date("2024-02-15")));
    assert_eq!(opts.risk_levels, RiskLevel::ALL.to_vec());
}

#[test]
fn dashboard_reuses_cached_table_until_republished() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_table.csv");
    let mut sink = CsvFileSink::new(&path);
    sink.publish(&fixture()).unwrap();

    let mut dash = Dashboard::new(&path);
    assert_eq!(dash.snapshot().unwrap().len(), 4);
    assert_eq!(dash.snapshot().unwrap().len(), 4);
    assert_eq!(dash.cache().loads(), 1);

    let mut smaller = fixture();
    smaller.records.truncate(2);
    sink.publish(&smaller).unwrap();
    assert_eq!(dash.snapshot().unwrap().len(), 2);
    assert_eq!(dash.cache().loads(), 2);
}
