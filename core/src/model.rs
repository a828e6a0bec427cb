//! Input records: raw CSV rows as read, and their validated forms.

use crate::types::{CustomerId, PaymentId, TxnId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnType {
    Sale,
    Purchase,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Purchase => "PURCHASE",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Raw rows ───────────────────────────────────────────────────────
//
// Every field is kept as text so that malformed values reach validation
// instead of failing deserialization. Optional columns default to blank.

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCustomer {
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawTransaction {
    pub txn_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub txn_date: String,
    #[serde(default)]
    pub txn_type: String,
    pub amount: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub due_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawPayment {
    #[serde(default)]
    pub payment_id: String,
    pub txn_id: String,
    #[serde(default)]
    pub payment_date: String,
    #[serde(default)]
    pub paid_amount: String,
}

/// One immutable snapshot of the three input tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    pub customers: Vec<RawCustomer>,
    pub transactions: Vec<RawTransaction>,
    pub payments: Vec<RawPayment>,
}

// ── Validated rows ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: CustomerId,
    pub customer_name: Option<String>,
    pub sector: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub txn_id: TxnId,
    pub customer_id: CustomerId,
    pub txn_date: Option<NaiveDate>,
    pub txn_type: Option<TxnType>,
    pub amount: f64,
    pub currency: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub payment_id: Option<PaymentId>,
    pub txn_id: TxnId,
    pub payment_date: Option<NaiveDate>,
    pub paid_amount: Option<f64>,
}
