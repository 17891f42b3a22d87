//! Parameter resolver: (industry, revenue) → (frequency, severity).
//!
//! RULE: The resolver never performs I/O. The stats table is loaded by
//! the caller (usually through `StatsCache`) and handed in as an `Arc`.

use crate::{
    error::{SimError, SimResult},
    revenue,
    stats::{RiskParams, StatsTable},
    types::Industry,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ParameterResolver {
    stats: Arc<StatsTable>,
}

impl ParameterResolver {
    pub fn new(stats: Arc<StatsTable>) -> Self {
        if stats.is_empty() {
            log::warn!("resolver: stats table is empty, every lookup will fail");
        }
        Self { stats }
    }

    /// Look up the parameters for a company. Values are returned exactly
    /// as stored; there is no interpolation between bands and no fallback.
    pub fn resolve(&self, industry: Industry, revenue: f64) -> SimResult<RiskParams> {
        let band = revenue::classify(revenue)?;

        let bands = self.stats.industry(industry).ok_or_else(|| {
            log::error!("Unknown industry: {industry}");
            SimError::UnknownIndustry { industry }
        })?;

        let params = bands.get(&band).copied().ok_or_else(|| {
            log::error!("Invalid revenue band: {band} for industry: {industry}");
            SimError::UnknownBand { industry, band }
        })?;

        log::debug!(
            "resolve: {industry}/{band} -> frequency={} severity={}",
            params.frequency,
            params.severity
        );
        Ok(params)
    }
}
