//! The Analysis Table: one denormalized row per surviving transaction row.
//!
//! Text encoding (the sole integration point for reporting consumers):
//!   - dates as `YYYY-MM-DD`
//!   - booleans as `True` / `False`
//!   - missing values as empty fields
//!   - integral floats with one decimal (`120000.0`), others shortest round-trip

use crate::{
    error::{PipelineResult, ValidationIssue, ValidationReport},
    model::TxnType,
    parse,
    risk::RiskLevel,
    types::{CustomerId, PaymentId, TableName, TxnId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub const UNKNOWN: &str = "Unknown";

pub const COLUMNS: [&str; 16] = [
    "txn_id",
    "customer_id",
    "txn_date",
    "txn_type",
    "amount",
    "currency",
    "due_date",
    "payment_id",
    "payment_date",
    "paid_amount",
    "is_paid",
    "delay_days",
    "customer_name",
    "sector",
    "country",
    "risk_level",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub txn_id: TxnId,
    pub customer_id: CustomerId,
    pub txn_date: Option<NaiveDate>,
    pub txn_type: Option<TxnType>,
    pub amount: f64,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_id: Option<PaymentId>,
    pub payment_date: Option<NaiveDate>,
    pub paid_amount: Option<f64>,
    pub is_paid: bool,
    pub delay_days: i64,
    pub customer_name: Option<String>,
    pub sector: String,
    pub country: String,
    pub risk_level: RiskLevel,
}

impl AnalysisRecord {
    /// Encode as text fields in [`COLUMNS`] order.
    pub fn to_fields(&self) -> [String; 16] {
        [
            self.txn_id.to_string(),
            self.customer_id.to_string(),
            format_date(self.txn_date),
            self.txn_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
            format_float(self.amount),
            self.currency.clone().unwrap_or_default(),
            format_date(self.due_date),
            self.payment_id.map(|p| p.to_string()).unwrap_or_default(),
            format_date(self.payment_date),
            self.paid_amount.map(format_float).unwrap_or_default(),
            format_bool(self.is_paid).to_string(),
            self.delay_days.to_string(),
            self.customer_name.clone().unwrap_or_default(),
            self.sector.clone(),
            self.country.clone(),
            self.risk_level.as_str().to_string(),
        ]
    }

    /// Month bucket (`YYYY-MM`) of the transaction date.
    pub fn month(&self) -> Option<String> {
        self.txn_date.map(|d| d.format("%Y-%m").to_string())
    }

    pub fn is_late(&self) -> bool {
        self.delay_days > 0
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Write records with a header row, in the Analysis Table encoding.
pub fn write_records<'a, W, I>(writer: W, records: I) -> PipelineResult<()>
where
    W: Write,
    I: IntoIterator<Item = &'a AnalysisRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.write_record(record.to_fields())?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisTable {
    pub records: Vec<AnalysisRecord>,
}

impl AnalysisTable {
    pub fn new(records: Vec<AnalysisRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnalysisRecord> {
        self.records.iter()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> PipelineResult<()> {
        write_records(writer, &self.records)
    }

    pub fn to_csv_bytes(&self) -> PipelineResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Read a published table. Dates are coerced (malformed → missing);
    /// unreadable identifiers, amounts or risk levels fail the load with
    /// every offending row listed.
    pub fn read_csv<R: Read>(reader: R) -> PipelineResult<Self> {
        let rows: Vec<AnalysisRow> = crate::ingest::read_rows(reader)?;
        let mut report = ValidationReport::default();
        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match row.decode() {
                Ok(record) => records.push(record),
                Err((field, value)) => report.push(ValidationIssue {
                    table: TableName::Analysis,
                    row: i + 1,
                    row_id: parse::parse_text(&row.txn_id),
                    field,
                    value,
                }),
            }
        }
        report.into_result()?;
        Ok(Self { records })
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file))
    }
}

impl<'a> IntoIterator for &'a AnalysisTable {
    type Item = &'a AnalysisRecord;
    type IntoIter = std::slice::Iter<'a, AnalysisRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A published row as text. Columns beyond the required ones may be absent
/// in tables produced by other tools.
#[derive(Debug, Deserialize)]
struct AnalysisRow {
    txn_id: String,
    customer_id: String,
    #[serde(default)]
    txn_date: String,
    #[serde(default)]
    txn_type: String,
    amount: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    due_date: String,
    #[serde(default)]
    payment_id: String,
    #[serde(default)]
    payment_date: String,
    #[serde(default)]
    paid_amount: String,
    #[serde(default)]
    is_paid: String,
    #[serde(default)]
    delay_days: String,
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    sector: String,
    #[serde(default)]
    country: String,
    risk_level: String,
}

impl AnalysisRow {
    fn decode(&self) -> Result<AnalysisRecord, (&'static str, String)> {
        let bad = |field: &'static str, raw: &str| (field, raw.trim().to_string());

        let txn_id = parse::parse_id(&self.txn_id)
            .ok()
            .flatten()
            .ok_or_else(|| bad("txn_id", &self.txn_id))?;
        let customer_id = parse::parse_id(&self.customer_id)
            .ok()
            .flatten()
            .ok_or_else(|| bad("customer_id", &self.customer_id))?;
        let amount = parse::parse_number(&self.amount)
            .ok()
            .flatten()
            .ok_or_else(|| bad("amount", &self.amount))?;
        let risk_level = self
            .risk_level
            .parse::<RiskLevel>()
            .map_err(|_| bad("risk_level", &self.risk_level))?;

        let payment_date = parse::parse_date(&self.payment_date).ok().flatten();
        // Tables without the column derive it the same way the pipeline does.
        let is_paid = parse::parse_bool(&self.is_paid).unwrap_or(payment_date.is_some());

        Ok(AnalysisRecord {
            txn_id,
            customer_id,
            txn_date: parse::parse_date(&self.txn_date).ok().flatten(),
            txn_type: parse::parse_txn_type(&self.txn_type).ok().flatten(),
            amount,
            currency: parse::parse_text(&self.currency),
            due_date: parse::parse_date(&self.due_date).ok().flatten(),
            payment_id: parse::parse_id(&self.payment_id).ok().flatten(),
            payment_date,
            paid_amount: parse::parse_number(&self.paid_amount).ok().flatten(),
            is_paid,
            delay_days: parse::parse_id(&self.delay_days).ok().flatten().unwrap_or(0),
            customer_name: parse::parse_text(&self.customer_name),
            sector: parse::parse_text(&self.sector).unwrap_or_else(|| UNKNOWN.to_string()),
            country: parse::parse_text(&self.country).unwrap_or_else(|| UNKNOWN.to_string()),
            risk_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_one_decimal_when_integral() {
        assert_eq!(format_float(120000.0), "120000.0");
        assert_eq!(format_float(1234.56), "1234.56");
        assert_eq!(format_float(0.1), "0.1");
    }

    #[test]
    fn booleans_use_title_case() {
        assert_eq!(format_bool(true), "True");
        assert_eq!(format_bool(false), "False");
    }
}
