//! In-memory aggregates over Analysis Table rows, shared by the chart
//! datasets and the dashboard.

use crate::{pipeline::RiskCounts, risk::RiskLevel, table::AnalysisRecord};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthValue {
    pub month: String,
    pub value: f64,
}

/// One row of the sector × risk pivot. Every level is present, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorRisk {
    pub sector: String,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

pub fn risk_counts<'a>(rows: impl IntoIterator<Item = &'a AnalysisRecord>) -> RiskCounts {
    let mut counts = RiskCounts::default();
    for r in rows {
        counts.add(r.risk_level);
    }
    counts
}

/// Customers ranked by number of High-risk rows, count desc then name asc.
/// Rows without a customer name are skipped.
pub fn top_high_risk_customers<'a>(
    rows: impl IntoIterator<Item = &'a AnalysisRecord>,
    n: usize,
) -> Vec<LabelCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in rows {
        if r.risk_level != RiskLevel::High {
            continue;
        }
        if let Some(name) = r.customer_name.as_deref() {
            *counts.entry(name).or_default() += 1;
        }
    }
    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked.truncate(n);
    ranked
}

/// Sum of `value` per transaction month, ascending by month.
/// Rows without a transaction date are skipped.
pub fn monthly_sum<'a, F>(rows: impl IntoIterator<Item = &'a AnalysisRecord>, value: F) -> Vec<MonthValue>
where
    F: Fn(&AnalysisRecord) -> f64,
{
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for r in rows {
        if let Some(month) = r.month() {
            *months.entry(month).or_default() += value(r);
        }
    }
    months
        .into_iter()
        .map(|(month, value)| MonthValue { month, value })
        .collect()
}

pub fn sector_risk_pivot<'a>(rows: impl IntoIterator<Item = &'a AnalysisRecord>) -> Vec<SectorRisk> {
    let mut pivot: BTreeMap<&str, RiskCounts> = BTreeMap::new();
    for r in rows {
        pivot.entry(r.sector.as_str()).or_default().add(r.risk_level);
    }
    pivot
        .into_iter()
        .map(|(sector, c)| SectorRisk {
            sector: sector.to_string(),
            low: c.low,
            medium: c.medium,
            high: c.high,
        })
        .collect()
}
