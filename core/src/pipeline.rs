//! The enrichment pipeline: raw snapshot → Analysis Table.
//!
//! STEP ORDER (fixed):
//!   1. Validate raw rows (all offending rows reported together)
//!   2. Left join transactions with payments on txn_id
//!   3. Drop exact duplicates across all joined columns
//!   4. Derive is_paid and delay_days
//!   5. Left join with customers on customer_id ("Unknown" fallback)
//!   6. Classify risk
//!
//! `run` is pure: no filesystem access, no clock, no randomness.
//! `Pipeline` wraps it with ingestion and publishing.

use crate::{
    config::{PipelineConfig, RiskThresholds},
    error::PipelineResult,
    ingest::{self, ValidatedTables},
    model::{Customer, Payment, RawTables, Transaction, TxnType},
    risk::{assign_risk_level, RiskLevel},
    sink::TableSink,
    table::{AnalysisRecord, AnalysisTable, UNKNOWN},
    types::{CustomerId, PaymentId, RunId, TxnId},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskCounts {
    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Counters describing one run, for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub customers_in: usize,
    pub transactions_in: usize,
    pub payments_in: usize,
    pub joined_rows: usize,
    pub duplicates_dropped: usize,
    pub output_rows: usize,
    pub unpaid: usize,
    pub unknown_customers: usize,
    pub multi_payment_txns: usize,
    /// Customer rows ignored because an earlier row had the same id.
    pub duplicate_customers: usize,
    pub due_before_txn_date: usize,
    pub coerced_fields: usize,
    pub risk: RiskCounts,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: AnalysisTable,
    pub stats: RunStats,
}

/// A transaction row with its matching payment, if any.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRow<'a> {
    pub txn: &'a Transaction,
    pub payment: Option<&'a Payment>,
}

/// Equality over every joined column. Floats compare by bit pattern.
#[derive(Debug, PartialEq, Eq, Hash)]
struct RowKey<'a> {
    txn_id: TxnId,
    customer_id: CustomerId,
    txn_date: Option<NaiveDate>,
    txn_type: Option<TxnType>,
    amount: u64,
    currency: Option<&'a str>,
    due_date: Option<NaiveDate>,
    payment_id: Option<PaymentId>,
    payment_date: Option<NaiveDate>,
    paid_amount: Option<u64>,
}

impl<'a> JoinedRow<'a> {
    fn key(&self) -> RowKey<'a> {
        let t = self.txn;
        RowKey {
            txn_id: t.txn_id,
            customer_id: t.customer_id,
            txn_date: t.txn_date,
            txn_type: t.txn_type,
            amount: t.amount.to_bits(),
            currency: t.currency.as_deref(),
            due_date: t.due_date,
            payment_id: self.payment.and_then(|p| p.payment_id),
            payment_date: self.payment.and_then(|p| p.payment_date),
            paid_amount: self.payment.and_then(|p| p.paid_amount).map(f64::to_bits),
        }
    }

    pub fn payment_date(&self) -> Option<NaiveDate> {
        self.payment.and_then(|p| p.payment_date)
    }

    /// True iff a payment date is present.
    pub fn is_paid(&self) -> bool {
        self.payment_date().is_some()
    }

    /// Days from due date to payment date. Exactly 0 when unpaid or when
    /// the due date is missing.
    pub fn delay_days(&self) -> i64 {
        match (self.payment_date(), self.txn.due_date) {
            (Some(paid), Some(due)) => (paid - due).num_days(),
            _ => 0,
        }
    }
}

/// Left join: every transaction row is kept, in input order. A transaction
/// matching several payments yields one row per payment.
pub fn join_payments<'a>(txns: &'a [Transaction], payments: &'a [Payment]) -> Vec<JoinedRow<'a>> {
    let mut by_txn: HashMap<TxnId, Vec<&Payment>> = HashMap::new();
    for p in payments {
        by_txn.entry(p.txn_id).or_default().push(p);
    }

    let mut rows = Vec::with_capacity(txns.len());
    for txn in txns {
        match by_txn.get(&txn.txn_id) {
            Some(matches) => {
                for p in matches {
                    rows.push(JoinedRow { txn, payment: Some(*p) });
                }
            }
            None => rows.push(JoinedRow { txn, payment: None }),
        }
    }
    rows
}

/// Drop rows identical across all joined columns, keeping the first.
pub fn drop_duplicates(rows: Vec<JoinedRow<'_>>) -> Vec<JoinedRow<'_>> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|r| seen.insert(r.key())).collect()
}

/// Run the pipeline over one raw snapshot.
pub fn run(inputs: &RawTables, thresholds: &RiskThresholds) -> PipelineResult<PipelineOutput> {
    thresholds.validate()?;
    let validated = ingest::validate(inputs)?;
    Ok(enrich(&validated, thresholds))
}

/// Steps 2–6 over validated rows.
pub fn enrich(tables: &ValidatedTables, thresholds: &RiskThresholds) -> PipelineOutput {
    let mut stats = RunStats {
        customers_in: tables.customers.len(),
        transactions_in: tables.transactions.len(),
        payments_in: tables.payments.len(),
        coerced_fields: tables.coerced_fields,
        ..RunStats::default()
    };

    let joined = join_payments(&tables.transactions, &tables.payments);
    stats.joined_rows = joined.len();
    stats.multi_payment_txns = count_multi_payment(&tables.payments);
    if stats.multi_payment_txns > 0 {
        log::warn!(
            "{} transaction(s) have more than one payment; each payment yields its own row",
            stats.multi_payment_txns
        );
    }
    log::info!("Merged transactions with payments: {} rows", joined.len());

    let deduped = drop_duplicates(joined);
    stats.duplicates_dropped = stats.joined_rows - deduped.len();
    log::info!("Dropped duplicates: {} removed", stats.duplicates_dropped);

    let (customers, duplicate_customers) = index_customers(&tables.customers);
    stats.duplicate_customers = duplicate_customers;

    let mut records = Vec::with_capacity(deduped.len());
    for row in &deduped {
        let is_paid = row.is_paid();
        let delay_days = row.delay_days();
        if !is_paid {
            stats.unpaid += 1;
        }
        if let (Some(due), Some(txn_date)) = (row.txn.due_date, row.txn.txn_date) {
            if due < txn_date {
                stats.due_before_txn_date += 1;
            }
        }

        let risk_level = assign_risk_level(row.txn.amount, delay_days, thresholds);
        let base = |c: Option<&Customer>| AnalysisRecord {
            txn_id: row.txn.txn_id,
            customer_id: row.txn.customer_id,
            txn_date: row.txn.txn_date,
            txn_type: row.txn.txn_type,
            amount: row.txn.amount,
            currency: row.txn.currency.clone(),
            due_date: row.txn.due_date,
            payment_id: row.payment.and_then(|p| p.payment_id),
            payment_date: row.payment_date(),
            paid_amount: row.payment.and_then(|p| p.paid_amount),
            is_paid,
            delay_days,
            customer_name: c.and_then(|c| c.customer_name.clone()),
            sector: c
                .and_then(|c| c.sector.clone())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            country: c
                .and_then(|c| c.country.clone())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            risk_level,
        };

        match customers.get(&row.txn.customer_id) {
            Some(c) => records.push(base(Some(*c))),
            None => {
                stats.unknown_customers += 1;
                records.push(base(None));
            }
        }
    }
    if stats.due_before_txn_date > 0 {
        log::warn!(
            "{} row(s) have due_date before txn_date; passed through unchanged",
            stats.due_before_txn_date
        );
    }
    log::info!(
        "Added customer attributes: {} row(s) without a matching customer",
        stats.unknown_customers
    );

    for r in &records {
        stats.risk.add(r.risk_level);
    }
    stats.output_rows = records.len();
    log::info!(
        "Computed risk_level: low={} medium={} high={}",
        stats.risk.low,
        stats.risk.medium,
        stats.risk.high
    );

    PipelineOutput {
        table: AnalysisTable::new(records),
        stats,
    }
}

/// One customer per id; the first row wins. Returns the index and the
/// number of rows skipped.
fn index_customers(customers: &[Customer]) -> (HashMap<CustomerId, &Customer>, usize) {
    let mut idx: HashMap<CustomerId, &Customer> = HashMap::new();
    let mut exact = 0;
    let mut conflicting = 0;
    for c in customers {
        match idx.get(&c.customer_id) {
            Some(first) if *first == c => exact += 1,
            Some(_) => conflicting += 1,
            None => {
                idx.insert(c.customer_id, c);
            }
        }
    }
    if exact > 0 {
        log::warn!("Dropped {exact} exact duplicate customer row(s)");
    }
    if conflicting > 0 {
        log::warn!(
            "{conflicting} customer row(s) reuse an earlier customer_id with different attributes; keeping the first"
        );
    }
    (idx, exact + conflicting)
}

fn count_multi_payment(payments: &[Payment]) -> usize {
    let mut counts: HashMap<TxnId, usize> = HashMap::new();
    for p in payments {
        *counts.entry(p.txn_id).or_default() += 1;
    }
    counts.values().filter(|&&n| n > 1).count()
}

/// One pipeline execution against the configured data directory.
pub struct Pipeline {
    pub run_id: RunId,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            run_id: format!("enrich-{}", Uuid::new_v4()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the snapshot, run, and publish to `sink`. Nothing is published
    /// when any step fails.
    pub fn execute(&self, sink: &mut dyn TableSink) -> PipelineResult<PipelineOutput> {
        log::info!("[{}] starting enrichment from {}", self.run_id, self.config.data_dir.display());
        let raw = ingest::load_raw_tables(&self.config)?;
        let output = run(&raw, &self.config.thresholds)?;
        sink.publish(&output.table)?;
        log::info!(
            "[{}] published {} row(s) to {}",
            self.run_id,
            output.table.len(),
            sink.describe()
        );
        Ok(output)
    }
}
