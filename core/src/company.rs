//! Synthetic company population.

use crate::{
    error::SimResult,
    revenue,
    rng::SimRng,
    types::{CompanyId, Industry, RevenueBand},
};
use serde::{Deserialize, Serialize};

/// Synthetic revenues are drawn from [MIN, MAX) and rounded.
pub const SYNTHETIC_REVENUE_MIN: f64 = 1.0;
pub const SYNTHETIC_REVENUE_MAX: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id:  CompanyId,
    /// Annual revenue in millions, whole number.
    pub revenue_usd: f64,
    pub industry:    Industry,
}

impl CompanyRecord {
    pub fn revenue_band(&self) -> SimResult<RevenueBand> {
        revenue::classify(self.revenue_usd)
    }
}

/// Generate `n` companies with ids 1..=n.
///
/// Revenue is uniform over [1, 1000) rounded to the nearest million;
/// industry is uniform over `Industry::ALL`. Revenue is drawn before
/// industry for each company, so the stream layout is fixed.
pub fn generate_companies(n: usize, rng: &mut SimRng) -> Vec<CompanyRecord> {
    let companies: Vec<CompanyRecord> = (1..=n as u64)
        .map(|company_id| {
            let revenue_usd = rng
                .uniform(SYNTHETIC_REVENUE_MIN, SYNTHETIC_REVENUE_MAX)
                .round();
            let industry = Industry::ALL[rng.next_u64_below(Industry::ALL.len() as u64) as usize];
            CompanyRecord { company_id, revenue_usd, industry }
        })
        .collect();
    log::debug!("generated {} synthetic companies", companies.len());
    companies
}
