//! Synthetic input generator: customers, transactions, payments.
//!
//! Produces the three raw tables the pipeline consumes, with the data
//! quality issues it must handle: duplicated transactions and unpaid
//! payments. Fully deterministic for a given seed.

use crate::{
    error::PipelineResult,
    model::{RawCustomer, RawPayment, RawTables, RawTransaction, Transaction, TxnType},
    rng::{RngBank, StreamSlot},
    table::{format_date, format_float},
    types::{TableName, TxnId},
};
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub n_customers: usize,
    pub n_transactions: usize,
    pub sectors: Vec<String>,
    pub countries: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Probability of SALE; the rest are PURCHASE.
    pub sale_share: f64,
    pub amount_log_mean: f64,
    pub amount_log_sigma: f64,
    pub currencies: Vec<(String, f64)>,
    pub min_due_days: i64,
    pub max_due_days: i64,
    pub duplicate_rate: f64,
    pub paid_probability: f64,
    pub min_delay_days: i64,
    pub max_delay_days: i64,
    /// Paid amount is amount × U(min_paid_ratio, 1.0).
    pub min_paid_ratio: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_customers: 120,
            n_transactions: 20_000,
            sectors: ["Manufacturing", "Retail", "Services", "Technology", "Logistics"]
                .map(String::from)
                .to_vec(),
            countries: ["PL", "TR", "DE", "FR", "NL"].map(String::from).to_vec(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date"),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).expect("valid date"),
            sale_share: 0.6,
            amount_log_mean: 10.3,
            amount_log_sigma: 0.7,
            currencies: vec![("PLN".into(), 0.75), ("EUR".into(), 0.15), ("USD".into(), 0.10)],
            min_due_days: 7,
            max_due_days: 60,
            duplicate_rate: 0.005,
            paid_probability: 0.88,
            min_delay_days: -5,
            max_delay_days: 60,
            min_paid_ratio: 0.85,
        }
    }
}

impl GeneratorConfig {
    /// Small population for unit tests.
    pub fn default_test() -> Self {
        Self {
            n_customers: 12,
            n_transactions: 400,
            duplicate_rate: 0.05,
            ..Self::default()
        }
    }
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn to_raw(t: &Transaction) -> RawTransaction {
    RawTransaction {
        txn_id: t.txn_id.to_string(),
        customer_id: t.customer_id.to_string(),
        txn_date: format_date(t.txn_date),
        txn_type: t.txn_type.map(|k| k.as_str().to_string()).unwrap_or_default(),
        amount: format_float(t.amount),
        currency: t.currency.clone().unwrap_or_default(),
        due_date: format_date(t.due_date),
    }
}

pub fn generate(config: &GeneratorConfig) -> RawTables {
    let bank = RngBank::new(config.seed);

    // 1) Customers
    let mut rng = bank.for_stream(StreamSlot::Customers);
    let customers: Vec<RawCustomer> = (1..=config.n_customers)
        .map(|i| RawCustomer {
            customer_id: i.to_string(),
            customer_name: format!("Customer_{i:03}"),
            sector: rng.choose(&config.sectors).clone(),
            country: rng.choose(&config.countries).clone(),
        })
        .collect();

    // 2) Transactions
    let mut rng = bank.for_stream(StreamSlot::Transactions);
    let days_range = (config.end_date - config.start_date).num_days().max(1);
    let currency_weights: Vec<f64> = config.currencies.iter().map(|(_, w)| *w).collect();
    let mut transactions: Vec<Transaction> = (1..=config.n_transactions)
        .map(|i| {
            let txn_date = config.start_date + Duration::days(rng.range_inclusive(0, days_range - 1));
            let txn_type = if rng.chance(config.sale_share) {
                TxnType::Sale
            } else {
                TxnType::Purchase
            };
            let amount = round_cents(rng.lognormal(config.amount_log_mean, config.amount_log_sigma));
            let currency = config.currencies[rng.weighted_index(&currency_weights)].0.clone();
            let due_days = rng.range_inclusive(config.min_due_days, config.max_due_days);
            Transaction {
                txn_id: i as TxnId,
                customer_id: rng.range_inclusive(1, config.n_customers.max(1) as i64),
                txn_date: Some(txn_date),
                txn_type: Some(txn_type),
                amount,
                currency: Some(currency),
                due_date: Some(txn_date + Duration::days(due_days)),
            }
        })
        .collect();

    // Data quality issue: duplicated transactions, appended.
    let mut rng = bank.for_stream(StreamSlot::Duplicates);
    let dup_n = (config.duplicate_rate * transactions.len() as f64) as usize;
    let dups: Vec<Transaction> = rng
        .sample_indices(transactions.len(), dup_n)
        .into_iter()
        .map(|i| transactions[i].clone())
        .collect();
    transactions.extend(dups);

    // 3) Payments: one row per transaction row, duplicates included.
    let mut rng = bank.for_stream(StreamSlot::Payments);
    let payments: Vec<RawPayment> = transactions
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut row = RawPayment {
                payment_id: (i + 1).to_string(),
                txn_id: t.txn_id.to_string(),
                ..RawPayment::default()
            };
            if rng.chance(config.paid_probability) {
                let delay = rng.range_inclusive(config.min_delay_days, config.max_delay_days);
                let ratio = rng.uniform(config.min_paid_ratio, 1.0);
                row.payment_date = format_date(t.due_date.map(|due| due + Duration::days(delay)));
                row.paid_amount = format_float(round_cents(t.amount * ratio));
            }
            row
        })
        .collect();
    let transactions: Vec<RawTransaction> = transactions.iter().map(to_raw).collect();

    log::info!(
        "Generated {} customers, {} transactions ({} duplicated), {} payments",
        customers.len(),
        transactions.len(),
        dup_n,
        payments.len()
    );

    RawTables {
        customers,
        transactions,
        payments,
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the three tables as `customers.csv`, `transactions.csv`,
/// `payments.csv` under `dir`.
pub fn write_tables(tables: &RawTables, dir: &Path) -> PipelineResult<()> {
    std::fs::create_dir_all(dir)?;
    write_csv(&dir.join(TableName::Customers.file_name()), &tables.customers)?;
    write_csv(&dir.join(TableName::Transactions.file_name()), &tables.transactions)?;
    write_csv(&dir.join(TableName::Payments.file_name()), &tables.payments)?;
    log::info!("Wrote raw tables to {}", dir.display());
    Ok(())
}
