use crate::simulator::{CostPolicy, DEFAULT_NUM_RUNS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "simulator.json";
pub const DEFAULT_STATS_FILE: &str = "stats/industry_stats.json";

/// Runtime settings, read from `<data_dir>/simulator.json`.
/// Every field is optional in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub db_path:              String,
    /// Relative paths are resolved against the data directory.
    pub stats_path:           PathBuf,
    pub num_companies:        usize,
    /// Monte Carlo runs per company.
    pub num_runs:             usize,
    pub clamp_negative_costs: bool,
    pub export_loss_log:      bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            db_path:              "cyber_risk.db".into(),
            stats_path:           PathBuf::from(DEFAULT_STATS_FILE),
            num_companies:        1000,
            num_runs:             DEFAULT_NUM_RUNS,
            clamp_negative_costs: false,
            export_loss_log:      false,
        }
    }
}

impl SimConfig {
    /// Load from the data/ directory. A missing config file falls back
    /// to defaults; a malformed one is an error.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = Path::new(data_dir).join(CONFIG_FILE);
        let mut config: SimConfig = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
            serde_json::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?
        } else {
            log::info!("{} not found, using defaults", path.display());
            SimConfig::default()
        };

        if config.stats_path.is_relative() {
            config.stats_path = Path::new(data_dir).join(&config.stats_path);
        }
        if config.num_runs == 0 {
            anyhow::bail!("num_runs must be at least 1");
        }
        Ok(config)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            db_path:              ":memory:".into(),
            stats_path:           PathBuf::new(),
            num_companies:        40,
            num_runs:             200,
            clamp_negative_costs: false,
            export_loss_log:      false,
        }
    }

    pub fn cost_policy(&self) -> CostPolicy {
        CostPolicy::from_clamp_flag(self.clamp_negative_costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_data_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cyber-risk-config-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = temp_data_dir("partial");
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "num_runs": 500, "clamp_negative_costs": true }"#).unwrap();

        let config = SimConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.num_runs, 500);
        assert_eq!(config.num_companies, 1000);
        assert_eq!(config.cost_policy(), CostPolicy::ClampAtZero);
        assert_eq!(config.stats_path, dir.join(DEFAULT_STATS_FILE));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = temp_data_dir("missing");
        let config = SimConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.num_runs, DEFAULT_NUM_RUNS);
        assert_eq!(config.cost_policy(), CostPolicy::Unbounded);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn zero_runs_is_rejected() {
        let dir = temp_data_dir("zero");
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "num_runs": 0 }"#).unwrap();
        assert!(SimConfig::load(dir.to_str().unwrap()).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn absolute_stats_path_is_kept() {
        let dir = temp_data_dir("abs");
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "stats_path": "/srv/stats.json" }"#).unwrap();
        let config = SimConfig::load(dir.to_str().unwrap()).unwrap();
        assert_eq!(config.stats_path, PathBuf::from("/srv/stats.json"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
