use crate::{
    error::{PipelineError, PipelineResult},
    risk::{
        HIGH_AMOUNT_THRESHOLD, HIGH_DELAY_THRESHOLD, MEDIUM_AMOUNT_THRESHOLD,
        MEDIUM_DELAY_THRESHOLD,
    },
    types::TableName,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config/risk_thresholds.json";
pub const REPORT_DB_FILE: &str = "finance.db";
pub const FIGURES_DIR: &str = "figures";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub high_amount: f64,
    pub medium_amount: f64,
    pub high_delay_days: i64,
    pub medium_delay_days: i64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_amount: HIGH_AMOUNT_THRESHOLD,
            medium_amount: MEDIUM_AMOUNT_THRESHOLD,
            high_delay_days: HIGH_DELAY_THRESHOLD,
            medium_delay_days: MEDIUM_DELAY_THRESHOLD,
        }
    }
}

impl RiskThresholds {
    /// Medium bounds must not exceed High bounds, or the Medium tier
    /// becomes unreachable for that dimension.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.high_amount.is_finite() || !self.medium_amount.is_finite() {
            return Err(PipelineError::InvalidConfig {
                reason: "amount thresholds must be finite".into(),
            });
        }
        if self.medium_amount > self.high_amount {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "medium_amount {} exceeds high_amount {}",
                    self.medium_amount, self.high_amount
                ),
            });
        }
        if self.medium_delay_days > self.high_delay_days {
            return Err(PipelineError::InvalidConfig {
                reason: format!(
                    "medium_delay_days {} exceeds high_delay_days {}",
                    self.medium_delay_days, self.high_delay_days
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PipelineConfigFile {
    #[serde(default)]
    risk_thresholds: RiskThresholds,
    #[serde(default)]
    output_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub thresholds: RiskThresholds,
    pub output_file: String,
    pub figures_dir: PathBuf,
    pub db_path: PathBuf,
}

impl PipelineConfig {
    /// Load from the data/ directory.
    /// The thresholds file is optional; built-in defaults apply when absent.
    /// In tests, use PipelineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE);
        if !path.exists() {
            log::info!("No {} found, using default thresholds", path.display());
            return Ok(Self::with_defaults(data_dir));
        }
        Self::load_file(data_dir, &path)
    }

    /// Load thresholds from an explicit config file.
    pub fn load_file(data_dir: &str, path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let file: PipelineConfigFile = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        file.risk_thresholds.validate()?;

        let mut config = Self::with_defaults(data_dir);
        config.thresholds = file.risk_thresholds;
        if let Some(output_file) = file.output_file {
            config.output_file = output_file;
        }
        log::info!("Loaded thresholds from {}: {:?}", path.display(), config.thresholds);
        Ok(config)
    }

    pub fn with_defaults(data_dir: &str) -> Self {
        let data_dir = PathBuf::from(data_dir);
        Self {
            figures_dir: data_dir.join(FIGURES_DIR),
            db_path: data_dir.join(REPORT_DB_FILE),
            output_file: TableName::Analysis.file_name().to_string(),
            thresholds: RiskThresholds::default(),
            data_dir,
        }
    }

    /// Config with default thresholds rooted at a scratch directory.
    pub fn default_test() -> Self {
        Self::with_defaults("./target/test-data")
    }

    pub fn input_path(&self, table: TableName) -> PathBuf {
        self.data_dir.join(table.file_name())
    }

    pub fn analysis_table_path(&self) -> PathBuf {
        self.data_dir.join(&self.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_file_keeps_defaults() {
        let file: PipelineConfigFile =
            serde_json::from_str(r#"{"risk_thresholds": {"high_amount": 250000}}"#).unwrap();
        assert_eq!(file.risk_thresholds.high_amount, 250_000.0);
        assert_eq!(file.risk_thresholds.medium_amount, MEDIUM_AMOUNT_THRESHOLD);
        assert_eq!(file.risk_thresholds.high_delay_days, HIGH_DELAY_THRESHOLD);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let t = RiskThresholds {
            medium_delay_days: 45,
            ..RiskThresholds::default()
        };
        assert!(t.validate().is_err());
        assert!(RiskThresholds::default().validate().is_ok());
    }
}
