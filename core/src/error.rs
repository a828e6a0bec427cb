use crate::types::TableName;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Publish failed for '{path}': {source}")]
    Publish {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// A field that could not be coerced to its target type.
///
/// Recovered locally: the caller substitutes the missing marker, except for
/// required fields, which escalate into a [`ValidationIssue`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("'{value}' is not a date")]
    Date { value: String },

    #[error("'{value}' is not an integer")]
    Integer { value: String },

    #[error("'{value}' is not a number")]
    Number { value: String },

    #[error("'{value}' is not a transaction type")]
    TxnType { value: String },
}

/// One offending row found while validating the raw tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub table: TableName,
    /// 1-based data row number (header excluded).
    pub row: usize,
    /// Raw identifier of the row (`txn_id`, `payment_id`, customer name), if readable.
    pub row_id: Option<String>,
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.row_id.as_deref().unwrap_or("?");
        if self.value.is_empty() {
            write!(f, "{} row {} (id {id}): {} is missing", self.table, self.row, self.field)
        } else {
            write!(
                f,
                "{} row {} (id {id}): {} = '{}' is not numeric",
                self.table, self.row, self.field, self.value
            )
        }
    }
}

/// Every offending row of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Raw identifiers of offending rows in the given table.
    pub fn offending_ids(&self, table: TableName) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.table == table)
            .filter_map(|i| i.row_id.as_deref())
            .collect()
    }

    pub fn into_result(self) -> Result<(), PipelineError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} offending row(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}
