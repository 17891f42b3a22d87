//! Industry statistics table: the reference data behind every simulation.
//!
//! The file is a nested JSON mapping:
//!   { "<industry>": { "<band label>": { "frequency": f64, "cost": f64 } } }
//!
//! Rows for industries or bands the simulator does not know are skipped
//! with a warning. Negative or non-finite parameters reject the whole
//! file: a bad number here would turn into NaN metrics downstream.

use crate::{
    error::{SimError, SimResult},
    types::{FrequencyParam, Industry, RevenueBand, SeverityParam},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Frequency/severity pair for one (industry, band) cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub frequency: FrequencyParam,
    #[serde(rename = "cost")]
    pub severity:  SeverityParam,
}

/// Raw file shape, before validation.
type StatsFile = HashMap<String, HashMap<String, RiskParams>>;

/// Read-only lookup table keyed by industry, then band.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsTable {
    rows: HashMap<Industry, HashMap<RevenueBand, RiskParams>>,
}

impl StatsTable {
    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let file: StatsFile = serde_json::from_str(content)?;
        let mut table = StatsTable::default();

        for (industry_key, bands) in file {
            let industry = match industry_key.parse::<Industry>() {
                Ok(i) => i,
                Err(_) => {
                    log::warn!("stats: skipping unknown industry '{industry_key}'");
                    continue;
                }
            };
            for (label, params) in bands {
                let band = match label.parse::<RevenueBand>() {
                    Ok(b) => b,
                    Err(_) => {
                        log::warn!("stats: skipping unknown band '{label}' for {industry}");
                        continue;
                    }
                };
                table.insert(industry, band, params)?;
            }
        }

        log::debug!("stats: loaded {} industries", table.rows.len());
        Ok(table)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Cannot read stats file {}: {e}", path.display())
        })?;
        Self::from_json_str(&content)
    }

    /// Insert one validated cell. Used by the loader and by tests
    /// that build tables by hand.
    pub fn insert(
        &mut self,
        industry: Industry,
        band:     RevenueBand,
        params:   RiskParams,
    ) -> SimResult<()> {
        for (field, value) in [("frequency", params.frequency), ("cost", params.severity)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::InvalidParameter { industry, band, field, value });
            }
        }
        self.rows.entry(industry).or_default().insert(band, params);
        Ok(())
    }

    pub fn with(mut self, industry: Industry, band: RevenueBand, params: RiskParams) -> SimResult<Self> {
        self.insert(industry, band, params)?;
        Ok(self)
    }

    pub fn industry(&self, industry: Industry) -> Option<&HashMap<RevenueBand, RiskParams>> {
        self.rows.get(&industry)
    }

    pub fn get(&self, industry: Industry, band: RevenueBand) -> Option<RiskParams> {
        self.rows.get(&industry)?.get(&band).copied()
    }

    pub fn industries(&self) -> impl Iterator<Item = Industry> + '_ {
        self.rows.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Lazily loaded, process-wide stats table.
///
/// The first successful `get()` reads the file; every later call returns
/// the same `Arc`. A failed load leaves the cache empty so the next call
/// retries. The mutex is held across the load, so concurrent first
/// callers wait for one read instead of racing.
pub struct StatsCache {
    path:  PathBuf,
    table: Mutex<Option<Arc<StatsTable>>>,
}

impl StatsCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), table: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> SimResult<Arc<StatsTable>> {
        let mut guard = self
            .table
            .lock()
            .map_err(|_| anyhow::anyhow!("stats cache lock poisoned"))?;
        if let Some(table) = guard.as_ref() {
            return Ok(Arc::clone(table));
        }
        log::debug!("stats: loading {}", self.path.display());
        let table = Arc::new(StatsTable::load(&self.path)?);
        *guard = Some(Arc::clone(&table));
        Ok(table)
    }

    pub fn is_loaded(&self) -> bool {
        self.table.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}
