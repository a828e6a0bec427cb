//! Chart datasets over the Analysis Table, written one JSON file per chart.
//!
//! Rendering is left to whatever reads the figures directory; this module
//! owns the numbers.

use crate::{
    aggregate::{self, LabelCount, MonthValue, SectorRisk},
    error::PipelineResult,
    risk::RiskLevel,
    table::AnalysisTable,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DELAY_BINS: usize = 40;
pub const TOP_CUSTOMERS: usize = 10;

/// Five-number summary of `amount` for one risk level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub risk_level: RiskLevel,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub risk_distribution: Vec<LabelCount>,
    pub amount_by_risk: Vec<BoxStats>,
    pub delay_histogram: Vec<HistogramBin>,
    pub high_risk_monthly: Vec<MonthValue>,
    pub risk_by_sector: Vec<SectorRisk>,
    pub top_customers_high_risk: Vec<LabelCount>,
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn box_stats(level: RiskLevel, mut values: Vec<f64>) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(BoxStats {
        risk_level: level,
        count: values.len(),
        min: values[0],
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values[values.len() - 1],
    })
}

/// Equal-width bins over [min, max]; the last bin is closed on the right.
/// A single distinct value gets the range value ± 0.5.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            count,
        })
        .collect()
}

impl ChartSet {
    pub fn build(table: &AnalysisTable) -> Self {
        let counts = aggregate::risk_counts(table);
        let risk_distribution = RiskLevel::ALL
            .iter()
            .map(|&level| LabelCount {
                label: level.as_str().to_string(),
                count: counts.get(level),
            })
            .collect();

        let amount_by_risk = RiskLevel::ALL
            .iter()
            .filter_map(|&level| {
                let amounts = table
                    .iter()
                    .filter(|r| r.risk_level == level)
                    .map(|r| r.amount)
                    .collect();
                box_stats(level, amounts)
            })
            .collect();

        let delays: Vec<f64> = table.iter().map(|r| r.delay_days as f64).collect();
        let high = || table.iter().filter(|r| r.risk_level == RiskLevel::High);

        Self {
            risk_distribution,
            amount_by_risk,
            delay_histogram: histogram(&delays, DELAY_BINS),
            high_risk_monthly: aggregate::monthly_sum(high(), |_| 1.0),
            risk_by_sector: aggregate::sector_risk_pivot(table),
            top_customers_high_risk: aggregate::top_high_risk_customers(table, TOP_CUSTOMERS),
        }
    }
}

fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> PipelineResult<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value)?)?;
    Ok(path)
}

/// Write every chart dataset into `dir`, returning the files in chart order.
pub fn write_figures(charts: &ChartSet, dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let files = vec![
        write_json(dir, "01_risk_distribution.json", &charts.risk_distribution)?,
        write_json(dir, "02_amount_by_risk_boxplot.json", &charts.amount_by_risk)?,
        write_json(dir, "03_delay_days_hist.json", &charts.delay_histogram)?,
        write_json(dir, "04_high_risk_monthly_trend.json", &charts.high_risk_monthly)?,
        write_json(dir, "05_risk_by_sector.json", &charts.risk_by_sector)?,
        write_json(dir, "06_top10_customers_high_risk.json", &charts.top_customers_high_risk)?,
    ];
    log::info!("Wrote {} chart dataset(s) to {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate_between_samples() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&v, 0.25), 1.75);
        assert_eq!(quantile(&v, 0.5), 2.5);
        assert_eq!(quantile(&v, 0.75), 3.25);
    }

    #[test]
    fn histogram_closes_last_bin() {
        let bins = histogram(&[0.0, 5.0, 10.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[1].count, 2, "max value belongs to the last bin");
    }

    #[test]
    fn histogram_of_constant_values_widens_range() {
        let bins = histogram(&[0.0, 0.0, 0.0], 40);
        assert_eq!(bins.len(), 40);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);
        assert_eq!(bins[0].start, -0.5);
        assert!((bins[39].end - 0.5).abs() < 1e-9);
    }
}
