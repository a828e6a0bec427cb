//! SQLite reporting store.
//!
//! RULE: Only the store talks to the database.
//! Consumers call store methods; they never execute SQL directly.
//! The store is read-only with respect to the Analysis Table's content:
//! `load_table` replaces it wholesale, nothing updates single rows.

use crate::{
    cache::Checksum,
    error::PipelineResult,
    sink::TableSink,
    table::{format_bool, format_date, AnalysisTable},
};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

mod queries;

pub use queries::{
    GroupColumn, GroupCount, GroupMean, MonthlyCount, QueryFilter, StandardReports,
};

pub const ANALYSIS_TABLE: &str = "transactions_analysis";

pub struct ReportStore {
    conn: Connection,
    path: Option<String>, // None for :memory:
}

/// One recorded publish into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub run_id: String,
    pub row_count: i64,
    pub checksum: String,
}

impl ReportStore {
    pub fn open(path: &str) -> PipelineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only matters for real files.
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            log::debug!("WAL mode not enabled for {path}: {e}");
        }
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> PipelineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_analysis.sql"))?;
        Ok(())
    }

    // ── Load ───────────────────────────────────────────────────

    /// Replace the table's contents in one transaction. Readers on other
    /// connections see either the old rows or the new rows.
    pub fn load_table(&mut self, table: &AnalysisTable) -> PipelineResult<usize> {
        let checksum = Checksum::of(&table.to_csv_bytes()?);
        let run_id = format!("load-{}", Uuid::new_v4());

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM transactions_analysis", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions_analysis (
                    txn_id, customer_id, txn_date, txn_type, amount, currency, due_date,
                    payment_id, payment_date, paid_amount, is_paid, delay_days,
                    customer_name, sector, country, risk_level
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
            )?;
            for r in table {
                stmt.execute(params![
                    r.txn_id,
                    r.customer_id,
                    r.txn_date.map(|d| format_date(Some(d))),
                    r.txn_type.map(|t| t.as_str()),
                    r.amount,
                    r.currency,
                    r.due_date.map(|d| format_date(Some(d))),
                    r.payment_id,
                    r.payment_date.map(|d| format_date(Some(d))),
                    r.paid_amount,
                    r.is_paid,
                    r.delay_days,
                    r.customer_name,
                    r.sector,
                    r.country,
                    r.risk_level.as_str(),
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO table_load (run_id, row_count, checksum) VALUES (?1, ?2, ?3)",
            params![run_id, table.len() as i64, checksum.to_string()],
        )?;
        tx.commit()?;

        log::info!(
            "Loaded {} row(s) into {ANALYSIS_TABLE} ({run_id}, checksum {checksum})",
            table.len()
        );
        Ok(table.len())
    }

    pub fn row_count(&self) -> PipelineResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions_analysis", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn last_load(&self) -> PipelineResult<Option<TableLoad>> {
        let load = self
            .conn
            .query_row(
                "SELECT run_id, row_count, checksum FROM table_load ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(TableLoad {
                        run_id: row.get(0)?,
                        row_count: row.get(1)?,
                        checksum: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(load)
    }

    /// Paid flag of every stored row, encoded as the CSV text. Used to
    /// check the store round-trips the table encoding.
    pub fn paid_flags(&self) -> PipelineResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT is_paid FROM transactions_analysis ORDER BY rowid")?;
        let flags = stmt
            .query_map([], |row| row.get::<_, bool>(0))?
            .map(|r| r.map(|b| format_bool(b).to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(flags)
    }
}

impl TableSink for ReportStore {
    fn publish(&mut self, table: &AnalysisTable) -> PipelineResult<()> {
        self.load_table(table)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.as_deref().unwrap_or(":memory:"))
    }
}
