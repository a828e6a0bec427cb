use super::{ReportStore, ANALYSIS_TABLE};
use crate::{
    error::{PipelineError, PipelineResult},
    risk::RiskLevel,
};
use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::Serialize;

/// Columns a report may group by. Only these are ever interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupColumn {
    RiskLevel,
    Sector,
    Country,
    CustomerName,
    TxnType,
    Currency,
    IsPaid,
}

impl GroupColumn {
    fn expr(self) -> &'static str {
        match self {
            Self::RiskLevel => "risk_level",
            Self::Sector => "sector",
            Self::Country => "country",
            Self::CustomerName => "customer_name",
            Self::TxnType => "txn_type",
            Self::Currency => "currency",
            Self::IsPaid => "CASE is_paid WHEN 1 THEN 'True' ELSE 'False' END",
        }
    }
}

/// Row filter shared by every aggregate. Empty sets mean "no restriction".
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub risk_levels: Vec<RiskLevel>,
    pub sectors: Vec<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl QueryFilter {
    pub fn risk(level: RiskLevel) -> Self {
        Self {
            risk_levels: vec![level],
            ..Self::default()
        }
    }

    fn conditions(&self, out: &mut Vec<String>, params: &mut Vec<Value>) {
        if !self.risk_levels.is_empty() {
            out.push(format!("risk_level IN ({})", placeholders(self.risk_levels.len())));
            params.extend(self.risk_levels.iter().map(|r| Value::Text(r.as_str().to_string())));
        }
        if !self.sectors.is_empty() {
            out.push(format!("sector IN ({})", placeholders(self.sectors.len())));
            params.extend(self.sectors.iter().cloned().map(Value::Text));
        }
        if let Some((from, to)) = self.date_range {
            out.push("txn_date BETWEEN ? AND ?".to_string());
            params.push(Value::Text(from.format("%Y-%m-%d").to_string()));
            params.push(Value::Text(to.format("%Y-%m-%d").to_string()));
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub key: Vec<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupMean {
    pub key: Vec<String>,
    pub mean_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: String,
    pub key: Vec<String>,
    pub count: i64,
}

/// The five canonical reports.
#[derive(Debug, Clone, Serialize)]
pub struct StandardReports {
    pub risk_distribution: Vec<GroupCount>,
    pub avg_amount_by_risk: Vec<GroupMean>,
    pub top_customers_high_risk: Vec<GroupCount>,
    pub risk_by_sector: Vec<GroupCount>,
    pub monthly_high_risk: Vec<MonthlyCount>,
}

/// SQL text plus bound parameters for one grouped aggregate.
struct GroupedQuery {
    sql: String,
    params: Vec<Value>,
}

impl GroupedQuery {
    /// `leading` columns go before the group keys in both SELECT and GROUP BY.
    fn build(
        leading: Option<&str>,
        groups: &[GroupColumn],
        aggregate: &str,
        filter: &QueryFilter,
        extra_conditions: &[&str],
        order_by: &str,
        limit: Option<usize>,
    ) -> Self {
        let mut keys: Vec<&str> = leading.into_iter().collect();
        keys.extend(groups.iter().map(|g| g.expr()));

        let mut conditions: Vec<String> = extra_conditions.iter().map(|c| c.to_string()).collect();
        // NULL keys are not a group.
        conditions.extend(groups.iter().map(|g| format!("{} IS NOT NULL", g.expr())));
        let mut params = Vec::new();
        filter.conditions(&mut conditions, &mut params);

        let mut sql = format!("SELECT {}, {aggregate} FROM {ANALYSIS_TABLE}", keys.join(", "));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(" GROUP BY {} ORDER BY {order_by}", keys.join(", ")));
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        Self { sql, params }
    }
}

fn key_order(groups: &[GroupColumn]) -> String {
    groups.iter().map(|g| g.expr()).collect::<Vec<_>>().join(", ")
}

fn require_groups(groups: &[GroupColumn]) -> PipelineResult<()> {
    if groups.is_empty() {
        return Err(PipelineError::InvalidConfig {
            reason: "at least one grouping column is required".into(),
        });
    }
    Ok(())
}

impl ReportStore {
    // ── Aggregates ─────────────────────────────────────────────

    /// Row counts per group, count desc then key asc.
    pub fn count_by(&self, groups: &[GroupColumn], filter: &QueryFilter) -> PipelineResult<Vec<GroupCount>> {
        self.grouped_counts(groups, filter, None)
    }

    /// The `n` largest groups by row count.
    pub fn top_n_by_count(
        &self,
        group: GroupColumn,
        filter: &QueryFilter,
        n: usize,
    ) -> PipelineResult<Vec<GroupCount>> {
        self.grouped_counts(&[group], filter, Some(n))
    }

    fn grouped_counts(
        &self,
        groups: &[GroupColumn],
        filter: &QueryFilter,
        limit: Option<usize>,
    ) -> PipelineResult<Vec<GroupCount>> {
        require_groups(groups)?;
        let q = GroupedQuery::build(
            None,
            groups,
            "COUNT(*) AS n",
            filter,
            &[],
            &format!("n DESC, {}", key_order(groups)),
            limit,
        );
        let width = groups.len();
        let mut stmt = self.conn.prepare(&q.sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(q.params.iter()), |row| {
                let key = (0..width)
                    .map(|i| row.get::<_, String>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GroupCount {
                    key,
                    count: row.get(width)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Mean amount per group rounded to 2 decimals, mean desc.
    pub fn mean_amount_by(&self, groups: &[GroupColumn], filter: &QueryFilter) -> PipelineResult<Vec<GroupMean>> {
        require_groups(groups)?;
        let q = GroupedQuery::build(
            None,
            groups,
            "ROUND(AVG(amount), 2) AS mean_amount",
            filter,
            &[],
            &format!("mean_amount DESC, {}", key_order(groups)),
            None,
        );
        let width = groups.len();
        let mut stmt = self.conn.prepare(&q.sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(q.params.iter()), |row| {
                let key = (0..width)
                    .map(|i| row.get::<_, String>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(GroupMean {
                    key,
                    mean_amount: row.get(width)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Row counts per `YYYY-MM` month of `txn_date` and group. Rows
    /// without a transaction date are left out. An empty `groups`
    /// gives one total per month.
    pub fn monthly_count_by(
        &self,
        groups: &[GroupColumn],
        filter: &QueryFilter,
    ) -> PipelineResult<Vec<MonthlyCount>> {
        let month = "strftime('%Y-%m', txn_date)";
        let order = if groups.is_empty() {
            month.to_string()
        } else {
            format!("{month}, {}", key_order(groups))
        };
        let q = GroupedQuery::build(
            Some(month),
            groups,
            "COUNT(*) AS n",
            filter,
            &["txn_date IS NOT NULL"],
            &order,
            None,
        );
        let width = groups.len();
        let mut stmt = self.conn.prepare(&q.sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(q.params.iter()), |row| {
                let key = (1..=width)
                    .map(|i| row.get::<_, String>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(MonthlyCount {
                    month: row.get(0)?,
                    key,
                    count: row.get(width + 1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Canned reports ─────────────────────────────────────────

    pub fn standard_reports(&self) -> PipelineResult<StandardReports> {
        let all = QueryFilter::default();
        let high = QueryFilter::risk(RiskLevel::High);

        let mut risk_by_sector = self.count_by(&[GroupColumn::Sector, GroupColumn::RiskLevel], &all)?;
        risk_by_sector.sort_by(|a, b| a.key[0].cmp(&b.key[0]).then_with(|| b.count.cmp(&a.count)));

        Ok(StandardReports {
            risk_distribution: self.count_by(&[GroupColumn::RiskLevel], &all)?,
            avg_amount_by_risk: self.mean_amount_by(&[GroupColumn::RiskLevel], &all)?,
            top_customers_high_risk: self.top_n_by_count(GroupColumn::CustomerName, &high, 10)?,
            risk_by_sector,
            monthly_high_risk: self.monthly_count_by(&[], &high)?,
        })
    }
}
