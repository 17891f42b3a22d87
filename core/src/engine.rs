//! The analysis engine. Runs the loss simulator over a whole
//! synthetic company population.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Record RunInitialized.
//!   2. Generate the company population from the Population stream.
//!   3. Simulate every company in parallel, each on its own Company stream.
//!   4. Persist results, loss logs and events in company-id order.
//!   5. Record RunCompleted.
//!
//! RULES:
//!   - All randomness flows through the RngBank.
//!   - Nothing touches the database from a worker thread.
//!   - Same seed ⇒ same persisted results and event payloads,
//!     whatever the thread count.

use crate::{
    company::{generate_companies, CompanyRecord},
    config::SimConfig,
    error::{SimError, SimResult},
    event::{AnalysisEvent, EventLogEntry},
    metrics::SimulationMetrics,
    resolver::ParameterResolver,
    rng::{RngBank, RngStream},
    simulator::{CyberRiskSimulator, LossRecord},
    stats::StatsTable,
    store::SimStore,
    types::{CompanyId, RunId},
};
use rayon::prelude::*;
use std::sync::Arc;

/// What one company's simulation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyOutcome {
    pub company_id: CompanyId,
    pub metrics:    SimulationMetrics,
    pub loss_log:   Option<Vec<LossRecord>>,
}

/// Totals for one `run_simulations` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub simulated: usize,
    pub skipped:   usize,
}

pub struct AnalysisEngine {
    pub run_id:   RunId,
    pub rng_bank: RngBank,
    pub store:    SimStore,
    config:       SimConfig,
    resolver:     ParameterResolver,
    companies:    Vec<CompanyRecord>,
    next_seq:     u64,
}

impl AnalysisEngine {
    pub fn new(
        run_id: RunId,
        seed:   u64,
        config: SimConfig,
        store:  SimStore,
        stats:  Arc<StatsTable>,
    ) -> Self {
        Self {
            rng_bank:  RngBank::new(seed),
            store,
            config,
            resolver:  ParameterResolver::new(stats),
            companies: Vec::new(),
            next_seq:  0,
            run_id,
        }
    }

    /// Build an engine, record the run and emit RunInitialized.
    /// Call this instead of new() for a fresh run.
    pub fn build(
        run_id: RunId,
        seed:   u64,
        config: SimConfig,
        store:  SimStore,
        stats:  Arc<StatsTable>,
    ) -> SimResult<Self> {
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        let mut engine = Self::new(run_id.clone(), seed, config, store, stats);
        engine.record(AnalysisEvent::RunInitialized { run_id, seed })?;
        log::info!("run {} initialized with seed {seed}", engine.run_id);
        Ok(engine)
    }

    /// Fully wired engine over an in-memory store, for tests.
    pub fn build_test(run_id: RunId, seed: u64, stats: Arc<StatsTable>) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id, seed, SimConfig::default_test(), store, stats)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn companies(&self) -> &[CompanyRecord] {
        &self.companies
    }

    /// Generate and persist the company population.
    pub fn generate(&mut self) -> SimResult<&[CompanyRecord]> {
        let mut rng = self.rng_bank.for_stream(RngStream::Population);
        let companies = generate_companies(self.config.num_companies, &mut rng);
        self.store.replace_companies(&self.run_id, &companies)?;
        self.record(AnalysisEvent::CompaniesGenerated { count: companies.len() })?;
        log::info!("run {}: {} companies generated", self.run_id, companies.len());
        self.companies = companies;
        Ok(&self.companies)
    }

    /// Use an existing population instead of generating one.
    pub fn load_companies(&mut self, companies: Vec<CompanyRecord>) -> SimResult<()> {
        self.store.replace_companies(&self.run_id, &companies)?;
        self.record(AnalysisEvent::CompaniesGenerated { count: companies.len() })?;
        self.companies = companies;
        Ok(())
    }

    /// Simulate one company on its own stream. Pure apart from logging.
    pub fn simulate_company(&self, company: &CompanyRecord) -> SimResult<CompanyOutcome> {
        simulate_one(company, &self.config, &self.resolver, self.rng_bank)
    }

    /// Simulate every company and persist the results.
    pub fn run_simulations(&mut self) -> SimResult<RunSummary> {
        log::debug!("run {}: running simulations", self.run_id);

        // The store is not Sync, so workers only see the shared read-only parts.
        let config = &self.config;
        let resolver = &self.resolver;
        let rng_bank = self.rng_bank;
        let outcomes: Vec<(&CompanyRecord, SimResult<CompanyOutcome>)> = self
            .companies
            .par_iter()
            .map(|company| (company, simulate_one(company, config, resolver, rng_bank)))
            .collect();

        let mut summary = RunSummary::default();
        let mut events = Vec::with_capacity(outcomes.len());
        let mut persisted = Vec::with_capacity(outcomes.len());

        for (company, outcome) in outcomes {
            match outcome {
                Ok(outcome) => {
                    log::debug!(
                        "company {} ({}, {}M): mean_loss={:.3}",
                        company.company_id,
                        company.industry,
                        company.revenue_usd,
                        outcome.metrics.mean_loss
                    );
                    events.push(AnalysisEvent::CompanySimulated {
                        company_id: company.company_id,
                        industry:   company.industry,
                        runs:       self.config.num_runs,
                        mean_loss:  outcome.metrics.mean_loss,
                        total_loss: outcome.metrics.total_loss,
                    });
                    persisted.push(outcome);
                    summary.simulated += 1;
                }
                // Reference-data gaps skip the company; anything else aborts the run.
                Err(e @ (SimError::UnknownIndustry { .. }
                | SimError::UnknownBand { .. }
                | SimError::InvalidRevenue { .. })) => {
                    log::warn!("company {} skipped: {e}", company.company_id);
                    events.push(AnalysisEvent::CompanySkipped {
                        company_id: company.company_id,
                        reason:     e.to_string(),
                    });
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        events.push(AnalysisEvent::RunCompleted {
            simulated: summary.simulated,
            skipped:   summary.skipped,
        });
        let entries = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| self.entry(self.next_seq + i as u64, &event))
            .collect::<SimResult<Vec<_>>>()?;

        // Results, loss logs and events commit together or not at all.
        self.store.commit_outcomes(&self.run_id, &persisted, &entries)?;
        self.next_seq += entries.len() as u64;

        log::info!(
            "run {}: {} companies simulated, {} skipped",
            self.run_id,
            summary.simulated,
            summary.skipped
        );
        Ok(summary)
    }

    /// Generate a population and simulate it.
    pub fn run(&mut self) -> SimResult<RunSummary> {
        self.generate()?;
        self.run_simulations()
    }

    /// Query events for this run from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events(&self) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_run(&self.run_id)
    }

    fn record(&mut self, event: AnalysisEvent) -> SimResult<()> {
        let entry = self.entry(self.next_seq, &event)?;
        self.store.append_event(&entry)?;
        self.next_seq += 1;
        Ok(())
    }

    fn entry(&self, seq: u64, event: &AnalysisEvent) -> SimResult<EventLogEntry> {
        Ok(EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            seq,
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        })
    }
}

fn simulate_one(
    company:  &CompanyRecord,
    config:   &SimConfig,
    resolver: &ParameterResolver,
    rng_bank: RngBank,
) -> SimResult<CompanyOutcome> {
    let simulator = CyberRiskSimulator::new(
        company.industry,
        company.revenue_usd,
        config.num_runs,
        resolver,
    )?
    .with_cost_policy(config.cost_policy());

    let mut rng = rng_bank.for_company(company.company_id);
    let outcome = if config.export_loss_log {
        let detailed = simulator.run_detailed(&mut rng);
        CompanyOutcome {
            company_id: company.company_id,
            metrics:    detailed.metrics,
            loss_log:   Some(detailed.loss_log),
        }
    } else {
        CompanyOutcome {
            company_id: company.company_id,
            metrics:    simulator.run(&mut rng),
            loss_log:   None,
        }
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        stats::RiskParams,
        types::{Industry, RevenueBand},
    };

    fn finance_stats() -> Arc<StatsTable> {
        let table = StatsTable::default()
            .with(Industry::Finance, RevenueBand::Band1B, RiskParams { frequency: 2.0, severity: 8.0 })
            .unwrap();
        Arc::new(table)
    }

    #[test]
    fn failed_persist_leaves_no_partial_results() {
        let mut engine = AnalysisEngine::build_test("engine-atomic".into(), 9, finance_stats()).unwrap();
        engine.config.export_loss_log = true;
        engine
            .load_companies(vec![
                CompanyRecord { company_id: 1, revenue_usd: 700.0, industry: Industry::Finance },
                CompanyRecord { company_id: 2, revenue_usd: 900.0, industry: Industry::Finance },
            ])
            .unwrap();

        // Loss log inserts now fail after the first result row is written.
        engine.store.conn().execute_batch("DROP TABLE loss_event").unwrap();
        let events_before = engine.store_events().unwrap().len();

        assert!(engine.run_simulations().is_err());
        assert_eq!(engine.store.result_count("engine-atomic").unwrap(), 0);
        assert_eq!(engine.store_events().unwrap().len(), events_before);
        assert_eq!(engine.store.event_count("engine-atomic", "run_completed").unwrap(), 0);
    }

    #[test]
    fn committed_run_has_contiguous_sequence() {
        let mut engine = AnalysisEngine::build_test("engine-seq".into(), 4, finance_stats()).unwrap();
        engine
            .load_companies(vec![
                CompanyRecord { company_id: 1, revenue_usd: 700.0, industry: Industry::Finance },
                CompanyRecord { company_id: 2, revenue_usd: 5.0, industry: Industry::Finance },
            ])
            .unwrap();
        let summary = engine.run_simulations().unwrap();
        assert_eq!(summary, RunSummary { simulated: 1, skipped: 1 });

        let seqs: Vec<u64> = engine.store_events().unwrap().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (0..seqs.len() as u64).collect::<Vec<_>>());
        assert_eq!(engine.store.result_count("engine-seq").unwrap(), 1);
    }
}
