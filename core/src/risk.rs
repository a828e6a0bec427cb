//! Rule-based risk tiers.
//!
//! A tier depends on `(amount, delay_days)` and the configured thresholds
//! only. The High rule is checked before the Medium rule, so a record that
//! satisfies both is High.

use crate::config::RiskThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const HIGH_AMOUNT_THRESHOLD: f64 = 100_000.0;
pub const MEDIUM_AMOUNT_THRESHOLD: f64 = 50_000.0;
pub const HIGH_DELAY_THRESHOLD: i64 = 30;
pub const MEDIUM_DELAY_THRESHOLD: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Display order used by every chart and pivot.
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" | "low" => Ok(Self::Low),
            "Medium" | "medium" => Ok(Self::Medium),
            "High" | "high" => Ok(Self::High),
            other => Err(format!("unknown risk level '{other}'")),
        }
    }
}

/// Assign a risk tier.
///
/// High:   amount >= high_amount   OR delay_days >= high_delay_days
/// Medium: amount >= medium_amount OR delay_days >= medium_delay_days
/// Low:    otherwise
pub fn assign_risk_level(amount: f64, delay_days: i64, thresholds: &RiskThresholds) -> RiskLevel {
    if amount >= thresholds.high_amount || delay_days >= thresholds.high_delay_days {
        return RiskLevel::High;
    }
    if amount >= thresholds.medium_amount || delay_days >= thresholds.medium_delay_days {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings() {
        assert_eq!("High".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert_eq!(" medium ".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert!("Critical".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn ordering_follows_severity() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
