//! Shared primitive types used across the pipeline and its consumers.

/// Surrogate key of a transaction. Not unique in raw input.
pub type TxnId = i64;

/// Surrogate key of a customer.
pub type CustomerId = i64;

/// Surrogate key of a payment.
pub type PaymentId = i64;

/// Identifier of one pipeline or generator run.
pub type RunId = String;

/// Name of a table on disk, used in reports and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableName {
    Customers,
    Transactions,
    Payments,
    Analysis,
}

impl TableName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Transactions => "transactions",
            Self::Payments => "payments",
            Self::Analysis => "analysis_table",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Customers => "customers.csv",
            Self::Transactions => "transactions.csv",
            Self::Payments => "payments.csv",
            Self::Analysis => "analysis_table.csv",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
