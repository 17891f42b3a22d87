//! Monte Carlo loss simulator for a single company.
//!
//! One simulation = N independent runs. Each run draws an attack count
//! from Poisson(frequency), then one cost per attack from
//! Normal(severity, severity * SEVERITY_DISPERSION). A run's loss is the
//! sum of its costs. The N run losses are reduced by `metrics::aggregate`.
//!
//! RULES:
//!   - Parameters are resolved (and validated) at construction.
//!     `run()` cannot fail.
//!   - All randomness comes from the injected `LossSampler`.
//!   - The loss log is only built when asked for, and is returned to
//!     the caller. The simulator keeps no state between calls.

use crate::{
    error::{SimError, SimResult},
    metrics::{self, SimulationMetrics},
    resolver::ParameterResolver,
    rng::LossSampler,
    stats::RiskParams,
    types::Industry,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUM_RUNS: usize = 10_000;

/// Cost standard deviation as a fraction of the severity mean.
pub const SEVERITY_DISPERSION: f64 = 0.1;

/// What to do with a negative cost draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostPolicy {
    /// Keep the Normal draw unchanged, negative values included.
    #[default]
    Unbounded,
    /// Replace negative draws with zero.
    ClampAtZero,
}

impl CostPolicy {
    pub fn from_clamp_flag(clamp: bool) -> Self {
        if clamp { Self::ClampAtZero } else { Self::Unbounded }
    }

    fn apply(&self, cost: f64) -> f64 {
        match self {
            Self::Unbounded   => cost,
            Self::ClampAtZero => cost.max(0.0),
        }
    }
}

/// One attack in the exported loss log. Both ids are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
    pub run_id:    u64,
    pub attack_id: u64,
    pub cost:      f64,
}

/// Metrics plus the per-attack log, from `run_detailed`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedOutcome {
    pub metrics:  SimulationMetrics,
    pub loss_log: Vec<LossRecord>,
}

#[derive(Debug, Clone)]
pub struct CyberRiskSimulator {
    industry:    Industry,
    revenue:     f64,
    num_runs:    usize,
    params:      RiskParams,
    cost_policy: CostPolicy,
}

impl CyberRiskSimulator {
    pub fn new(
        industry: Industry,
        revenue:  f64,
        num_runs: usize,
        resolver: &ParameterResolver,
    ) -> SimResult<Self> {
        log::debug!("simulator: init industry={industry} revenue={revenue} runs={num_runs}");
        if num_runs < 1 {
            return Err(SimError::InvalidRunCount { runs: num_runs });
        }
        let params = resolver.resolve(industry, revenue)?;
        Ok(Self {
            industry,
            revenue,
            num_runs,
            params,
            cost_policy: CostPolicy::default(),
        })
    }

    pub fn with_cost_policy(mut self, cost_policy: CostPolicy) -> Self {
        self.cost_policy = cost_policy;
        self
    }

    pub fn industry(&self) -> Industry { self.industry }
    pub fn revenue(&self) -> f64 { self.revenue }
    pub fn num_runs(&self) -> usize { self.num_runs }
    pub fn params(&self) -> RiskParams { self.params }
    pub fn cost_policy(&self) -> CostPolicy { self.cost_policy }

    /// Run the simulation and summarise it.
    pub fn run<S: LossSampler + ?Sized>(&self, sampler: &mut S) -> SimulationMetrics {
        let losses = self.simulate(sampler, None);
        metrics::aggregate(&losses)
    }

    /// Run the simulation and also return every attack's cost.
    pub fn run_detailed<S: LossSampler + ?Sized>(&self, sampler: &mut S) -> DetailedOutcome {
        let mut loss_log = Vec::new();
        let losses = self.simulate(sampler, Some(&mut loss_log));
        DetailedOutcome {
            metrics: metrics::aggregate(&losses),
            loss_log,
        }
    }

    fn simulate<S: LossSampler + ?Sized>(
        &self,
        sampler: &mut S,
        mut loss_log: Option<&mut Vec<LossRecord>>,
    ) -> Vec<f64> {
        let frequency = self.params.frequency;
        let mean = self.params.severity;
        let std_dev = mean * SEVERITY_DISPERSION;

        // All counts are drawn before any cost, one per run.
        let attack_counts: Vec<u64> = (0..self.num_runs)
            .map(|_| sampler.attack_count(frequency))
            .collect();

        let mut losses = vec![0.0; self.num_runs];
        for (i, &count) in attack_counts.iter().enumerate() {
            for attack in 0..count {
                let cost = self.cost_policy.apply(sampler.attack_cost(mean, std_dev));
                losses[i] += cost;
                if let Some(loss_log) = loss_log.as_deref_mut() {
                    loss_log.push(LossRecord {
                        run_id:    i as u64 + 1,
                        attack_id: attack + 1,
                        cost,
                    });
                }
            }
        }

        log::debug!(
            "simulator: {} runs, {} attacks for {}",
            self.num_runs,
            attack_counts.iter().sum::<u64>(),
            self.industry
        );
        losses
    }
}

/// Column header of an exported loss log.
pub const LOSS_LOG_HEADER: [&str; 3] = ["run_id", "attack_id", "cost"];

/// Write a loss log as CSV. The header is written even when there are
/// no rows.
pub fn write_loss_log_csv<W: std::io::Write>(writer: W, records: &[LossRecord]) -> SimResult<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(LOSS_LOG_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Default export file name, stamped with the given time.
pub fn loss_log_file_name<Tz>(now: &chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("simulation_results_{}.csv", now.format("%Y-%m-%d_%H-%M-%S"))
}
