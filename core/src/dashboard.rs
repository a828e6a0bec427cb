//! Interactive-dashboard backend: filtering, summary metrics and the
//! datasets behind each dashboard panel.
//!
//! The table is loaded through [`TableCache`], so repeated interactions
//! against an unchanged file never re-parse it.

use crate::{
    aggregate::{self, LabelCount, MonthValue, SectorRisk},
    cache::TableCache,
    error::{PipelineError, PipelineResult},
    risk::RiskLevel,
    table::{write_records, AnalysisRecord, AnalysisTable},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TOP_CUSTOMERS: usize = 10;

/// `None` on any axis means "no restriction".
#[derive(Debug, Clone, Default)]
pub struct DashboardFilter {
    pub risk_levels: Option<BTreeSet<RiskLevel>>,
    pub sectors: Option<BTreeSet<String>>,
    /// Inclusive on both ends.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl DashboardFilter {
    pub fn validate(&self) -> PipelineResult<()> {
        if let Some((start, end)) = self.date_range {
            if start > end {
                return Err(PipelineError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }

    /// Rows without a transaction date never match a date range.
    pub fn matches(&self, r: &AnalysisRecord) -> bool {
        if let Some(levels) = &self.risk_levels {
            if !levels.contains(&r.risk_level) {
                return false;
            }
        }
        if let Some(sectors) = &self.sectors {
            if !sectors.contains(&r.sector) {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            match r.txn_date {
                Some(d) if d >= start && d <= end => {}
                _ => return false,
            }
        }
        true
    }
}

/// Values the filter widgets offer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub risk_levels: Vec<RiskLevel>,
    pub sectors: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

pub fn filter_options(table: &AnalysisTable) -> FilterOptions {
    let sectors: BTreeSet<&str> = table.iter().map(|r| r.sector.as_str()).collect();
    let dates = table.iter().filter_map(|r| r.txn_date);
    FilterOptions {
        risk_levels: RiskLevel::ALL.to_vec(),
        sectors: sectors.into_iter().map(String::from).collect(),
        min_date: dates.clone().min(),
        max_date: dates.max(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_transactions: usize,
    pub total_amount: f64,
    pub avg_delay_days: f64,
    pub high_risk_count: usize,
    pub high_risk_ratio_pct: f64,
    pub paid_rate_pct: f64,
    /// Share of rows with `delay_days > 0`.
    pub late_rate_pct: f64,
}

/// The rows that survived a filter. Never empty.
#[derive(Debug)]
pub struct FilteredView<'a> {
    rows: Vec<&'a AnalysisRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[&'a AnalysisRecord] {
        &self.rows
    }

    pub fn summary(&self) -> SummaryMetrics {
        let n = self.rows.len();
        let pct = |k: usize| if n == 0 { 0.0 } else { k as f64 * 100.0 / n as f64 };
        let high = self.rows.iter().filter(|r| r.risk_level == RiskLevel::High).count();
        let paid = self.rows.iter().filter(|r| r.is_paid).count();
        let late = self.rows.iter().filter(|r| r.is_late()).count();
        let delay_sum: i64 = self.rows.iter().map(|r| r.delay_days).sum();
        SummaryMetrics {
            total_transactions: n,
            total_amount: self.rows.iter().map(|r| r.amount).sum(),
            avg_delay_days: if n == 0 { 0.0 } else { delay_sum as f64 / n as f64 },
            high_risk_count: high,
            high_risk_ratio_pct: pct(high),
            paid_rate_pct: pct(paid),
            late_rate_pct: pct(late),
        }
    }

    /// Newest first; rows without a date go last, in table order.
    pub fn rows_by_date_desc(&self) -> Vec<&'a AnalysisRecord> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a.txn_date, b.txn_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows
    }

    pub fn top_high_risk_customers(&self) -> Vec<LabelCount> {
        aggregate::top_high_risk_customers(self.rows.iter().copied(), TOP_CUSTOMERS)
    }

    pub fn monthly_amount(&self) -> Vec<MonthValue> {
        aggregate::monthly_sum(self.rows.iter().copied(), |r| r.amount)
    }

    pub fn sector_risk_pivot(&self) -> Vec<SectorRisk> {
        aggregate::sector_risk_pivot(self.rows.iter().copied())
    }

    /// Export in the Analysis Table encoding, date-descending like the
    /// on-screen listing.
    pub fn write_csv<W: Write>(&self, writer: W) -> PipelineResult<()> {
        write_records(writer, self.rows_by_date_desc())
    }

    pub fn to_csv_bytes(&self) -> PipelineResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }
}

#[derive(Debug)]
pub enum DashboardOutcome<'a> {
    /// Nothing matched; the message is meant for display.
    Empty { message: String },
    Ready(FilteredView<'a>),
}

pub fn apply_filter<'a>(
    table: &'a AnalysisTable,
    filter: &DashboardFilter,
) -> PipelineResult<DashboardOutcome<'a>> {
    filter.validate()?;
    let rows: Vec<&AnalysisRecord> = table.iter().filter(|r| filter.matches(r)).collect();
    if rows.is_empty() {
        log::debug!("dashboard filter matched no rows");
        return Ok(DashboardOutcome::Empty {
            message: "No data for the selected filters.".to_string(),
        });
    }
    Ok(DashboardOutcome::Ready(FilteredView { rows }))
}

/// A dashboard bound to one published table file.
pub struct Dashboard {
    path: PathBuf,
    cache: TableCache,
}

impl Dashboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: TableCache::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current table contents; re-read only when the file changed.
    pub fn snapshot(&mut self) -> PipelineResult<Arc<AnalysisTable>> {
        self.cache.load(&self.path)
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }
}
