//! Ingestion boundary.
//!
//! Reads the three raw CSV tables and validates them into typed rows.
//! Dates and optional numbers are coerced (malformed → missing);
//! required identifiers and `amount` are validated, and every offending
//! row is collected into one [`ValidationReport`].

use crate::{
    config::PipelineConfig,
    error::{PipelineResult, ValidationIssue, ValidationReport},
    model::{Customer, Payment, RawCustomer, RawPayment, RawTables, RawTransaction, Transaction},
    parse::{self, Coercions},
    types::TableName,
};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

/// Read all rows of one CSV table, matching columns by header name.
pub fn read_rows<T: DeserializeOwned, R: Read>(reader: R) -> PipelineResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let rows = rdr.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

pub fn read_table<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    let file = std::fs::File::open(path)?;
    read_rows(file)
}

/// Load the raw snapshot from the configured data directory.
pub fn load_raw_tables(config: &PipelineConfig) -> PipelineResult<RawTables> {
    let customers: Vec<RawCustomer> = read_table(&config.input_path(TableName::Customers))?;
    let transactions: Vec<RawTransaction> =
        read_table(&config.input_path(TableName::Transactions))?;
    let payments: Vec<RawPayment> = read_table(&config.input_path(TableName::Payments))?;
    log::info!(
        "Loaded raw tables: {} customers, {} transactions, {} payments",
        customers.len(),
        transactions.len(),
        payments.len()
    );
    Ok(RawTables {
        customers,
        transactions,
        payments,
    })
}

/// The validated snapshot plus the number of recovered coercions.
#[derive(Debug, Clone)]
pub struct ValidatedTables {
    pub customers: Vec<Customer>,
    pub transactions: Vec<Transaction>,
    pub payments: Vec<Payment>,
    pub coerced_fields: usize,
}

/// Validate every raw row. Fails with all offending rows at once.
pub fn validate(raw: &RawTables) -> PipelineResult<ValidatedTables> {
    let mut report = ValidationReport::default();
    let mut coercions = Coercions::default();

    let customers = validate_customers(&raw.customers, &mut report);
    let transactions = validate_transactions(&raw.transactions, &mut report, &mut coercions);
    let payments = validate_payments(&raw.payments, &mut report, &mut coercions);

    if !report.is_empty() {
        log::warn!("Validation failed: {} offending row(s)", report.issues.len());
    }
    report.into_result()?;

    if coercions.count > 0 {
        log::warn!("{} malformed field(s) coerced to missing", coercions.count);
    }
    Ok(ValidatedTables {
        customers,
        transactions,
        payments,
        coerced_fields: coercions.count,
    })
}

/// Resolve a required integer or number; record an issue when absent or malformed.
fn required<T>(
    result: Result<Option<T>, crate::error::ParseError>,
    issue: impl FnOnce() -> ValidationIssue,
    report: &mut ValidationReport,
) -> Option<T> {
    match result {
        Ok(Some(v)) => Some(v),
        Ok(None) | Err(_) => {
            report.push(issue());
            None
        }
    }
}

fn row_id(raw: &str) -> Option<String> {
    parse::parse_text(raw)
}

fn validate_customers(
    rows: &[RawCustomer],
    report: &mut ValidationReport,
) -> Vec<Customer> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, r) in rows.iter().enumerate() {
        let customer_id = required(
            parse::parse_id(&r.customer_id),
            || ValidationIssue {
                table: TableName::Customers,
                row: i + 1,
                row_id: row_id(&r.customer_name),
                field: "customer_id",
                value: r.customer_id.trim().to_string(),
            },
            report,
        );
        if let Some(customer_id) = customer_id {
            out.push(Customer {
                customer_id,
                customer_name: parse::parse_text(&r.customer_name),
                sector: parse::parse_text(&r.sector),
                country: parse::parse_text(&r.country),
            });
        }
    }
    out
}

fn validate_transactions(
    rows: &[RawTransaction],
    report: &mut ValidationReport,
    coercions: &mut Coercions,
) -> Vec<Transaction> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, r) in rows.iter().enumerate() {
        let issue = |field: &'static str, value: &str| ValidationIssue {
            table: TableName::Transactions,
            row: i + 1,
            row_id: row_id(&r.txn_id),
            field,
            value: value.trim().to_string(),
        };

        let txn_id = required(parse::parse_id(&r.txn_id), || issue("txn_id", &r.txn_id), report);
        let customer_id = required(
            parse::parse_id(&r.customer_id),
            || issue("customer_id", &r.customer_id),
            report,
        );
        let amount = required(parse::parse_number(&r.amount), || issue("amount", &r.amount), report);

        let (Some(txn_id), Some(customer_id), Some(amount)) = (txn_id, customer_id, amount) else {
            continue;
        };
        out.push(Transaction {
            txn_id,
            customer_id,
            txn_date: coercions.recover("txn_date", parse::parse_date(&r.txn_date)),
            txn_type: coercions.recover("txn_type", parse::parse_txn_type(&r.txn_type)),
            amount,
            currency: parse::parse_text(&r.currency),
            due_date: coercions.recover("due_date", parse::parse_date(&r.due_date)),
        });
    }
    out
}

fn validate_payments(
    rows: &[RawPayment],
    report: &mut ValidationReport,
    coercions: &mut Coercions,
) -> Vec<Payment> {
    let mut out = Vec::with_capacity(rows.len());
    for (i, r) in rows.iter().enumerate() {
        let txn_id = required(
            parse::parse_id(&r.txn_id),
            || ValidationIssue {
                table: TableName::Payments,
                row: i + 1,
                row_id: row_id(&r.payment_id),
                field: "txn_id",
                value: r.txn_id.trim().to_string(),
            },
            report,
        );
        let Some(txn_id) = txn_id else {
            continue;
        };
        out.push(Payment {
            payment_id: coercions.recover("payment_id", parse::parse_id(&r.payment_id)),
            txn_id,
            payment_date: coercions.recover("payment_date", parse::parse_date(&r.payment_date)),
            paid_amount: coercions.recover("paid_amount", parse::parse_number(&r.paid_amount)),
        });
    }
    out
}
