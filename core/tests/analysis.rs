//! Population runs, skipped companies and the stored-result queries.

use approx::assert_relative_eq;
use cyber_risk_core::{
    company::CompanyRecord,
    config::SimConfig,
    engine::AnalysisEngine,
    stats::{RiskParams, StatsTable},
    store::SimStore,
    types::{Industry, RevenueBand},
};
use std::sync::Arc;

fn bundled_stats() -> Arc<StatsTable> {
    Arc::new(
        StatsTable::from_json_str(include_str!("../../data/stats/industry_stats.json")).unwrap(),
    )
}

fn company(company_id: u64, revenue_usd: f64, industry: Industry) -> CompanyRecord {
    CompanyRecord { company_id, revenue_usd, industry }
}

#[test]
fn full_run_stores_one_result_per_company() {
    let mut engine = AnalysisEngine::build_test("analysis-count".into(), 42, bundled_stats()).unwrap();
    let summary = engine.run().unwrap();

    assert_eq!(summary.simulated, 40, "Expected 40 test companies simulated");
    assert_eq!(summary.skipped, 0);
    assert_eq!(engine.store.company_count("analysis-count").unwrap(), 40);
    assert_eq!(engine.store.result_count("analysis-count").unwrap(), 40);
    assert_eq!(engine.store.event_count("analysis-count", "company_simulated").unwrap(), 40);
    assert_eq!(engine.store.event_count("analysis-count", "run_completed").unwrap(), 1);
}

#[test]
fn event_sequence_is_contiguous() {
    let mut engine = AnalysisEngine::build_test("analysis-seq".into(), 5, bundled_stats()).unwrap();
    engine.run().unwrap();

    let events = engine.store_events().unwrap();
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (0..events.len() as u64).collect::<Vec<_>>());
    assert_eq!(events.first().unwrap().event_type, "run_initialized");
    assert_eq!(events.last().unwrap().event_type, "run_completed");
}

#[test]
fn companies_missing_from_stats_are_skipped() {
    let stats = StatsTable::default()
        .with(Industry::Retail, RevenueBand::Band10M, RiskParams { frequency: 0.25, severity: 0.31 })
        .unwrap();
    let mut engine = AnalysisEngine::build_test("analysis-skip".into(), 3, Arc::new(stats)).unwrap();
    engine
        .load_companies(vec![
            company(1, 5.0, Industry::Retail),
            company(2, 5.0, Industry::Healthcare),
            company(3, 250.0, Industry::Retail),
            company(4, 1200.0, Industry::Retail),
        ])
        .unwrap();

    let summary = engine.run_simulations().unwrap();
    assert_eq!(summary.simulated, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(engine.store.event_count("analysis-skip", "company_skipped").unwrap(), 3);

    assert!(engine.store.mean_loss_for_company("analysis-skip", 1).unwrap().is_some());
    assert!(engine.store.mean_loss_for_company("analysis-skip", 2).unwrap().is_none());
}

#[test]
fn mean_loss_for_unknown_company_is_none() {
    let mut engine = AnalysisEngine::build_test("analysis-none".into(), 8, bundled_stats()).unwrap();
    engine.run().unwrap();
    assert_eq!(engine.store.mean_loss_for_company("analysis-none", 9_999).unwrap(), None);
    assert_eq!(engine.store.mean_loss_for_company("other-run", 1).unwrap(), None);
}

#[test]
fn segmentation_averages_matching_companies_only() {
    let mut engine = AnalysisEngine::build_test("analysis-seg".into(), 21, bundled_stats()).unwrap();
    engine
        .load_companies(vec![
            company(1, 10.0, Industry::Finance),       // 10M upper edge
            company(2, 11.0, Industry::Finance),       // 100M
            company(3, 100.0, Industry::Finance),      // 100M upper edge
            company(4, 50.0, Industry::Healthcare),    // 100M, other industry
            company(5, 600.0, Industry::Finance),      // 1B
        ])
        .unwrap();
    engine.run_simulations().unwrap();

    let mean = |id| engine.store.mean_loss_for_company("analysis-seg", id).unwrap().unwrap();

    let avg = engine
        .store
        .average_mean_loss_by_segmentation("analysis-seg", &[RevenueBand::Band100M], &[Industry::Finance])
        .unwrap()
        .expect("two finance companies in 100M");
    assert_relative_eq!(avg, (mean(2) + mean(3)) / 2.0, max_relative = 1e-12);

    let avg = engine
        .store
        .average_mean_loss_by_segmentation(
            "analysis-seg",
            &[RevenueBand::Band10M, RevenueBand::Band100M],
            &[Industry::Finance, Industry::Healthcare],
        )
        .unwrap()
        .unwrap();
    assert_relative_eq!(
        avg,
        (mean(1) + mean(2) + mean(3) + mean(4)) / 4.0,
        max_relative = 1e-12
    );
}

#[test]
fn segmentation_without_matches_is_none() {
    let mut engine = AnalysisEngine::build_test("analysis-seg-none".into(), 2, bundled_stats()).unwrap();
    engine
        .load_companies(vec![company(1, 40.0, Industry::Retail)])
        .unwrap();
    engine.run_simulations().unwrap();

    let store = &engine.store;
    assert_eq!(
        store.average_mean_loss_by_segmentation("analysis-seg-none", &[RevenueBand::Band1B], &[Industry::Retail]).unwrap(),
        None
    );
    assert_eq!(
        store.average_mean_loss_by_segmentation("analysis-seg-none", &[], &[Industry::Retail]).unwrap(),
        None
    );
    assert_eq!(
        store.average_mean_loss_by_segmentation("analysis-seg-none", &[RevenueBand::Band100M], &[]).unwrap(),
        None
    );
}

#[test]
fn loss_log_is_persisted_when_enabled() {
    let mut config = SimConfig::default_test();
    config.export_loss_log = true;
    config.num_runs = 50;
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();

    let mut engine = AnalysisEngine::build("analysis-losses".into(), 13, config, store, bundled_stats()).unwrap();
    engine
        .load_companies(vec![company(1, 800.0, Industry::Finance)])
        .unwrap();
    engine.run_simulations().unwrap();

    let records = engine.store.loss_events("analysis-losses", 1).unwrap();
    assert_eq!(records.len() as i64, engine.store.loss_event_count("analysis-losses").unwrap());
    let logged: f64 = records.iter().map(|r| r.cost).sum();
    let results = engine.store.results("analysis-losses").unwrap();
    assert_relative_eq!(logged, results[0].metrics.total_loss, max_relative = 1e-9);
}

#[test]
fn loss_log_is_empty_by_default() {
    let mut engine = AnalysisEngine::build_test("analysis-nolog".into(), 13, bundled_stats()).unwrap();
    engine.run().unwrap();
    assert_eq!(engine.store.loss_event_count("analysis-nolog").unwrap(), 0);
}

#[test]
fn stored_companies_round_trip() {
    let mut engine = AnalysisEngine::build_test("analysis-companies".into(), 77, bundled_stats()).unwrap();
    engine.generate().unwrap();
    let stored = engine.store.companies("analysis-companies").unwrap();
    assert_eq!(stored, engine.companies());
}

#[test]
fn results_and_loss_rows_can_be_stored_directly() {
    use cyber_risk_core::{metrics::SimulationMetrics, simulator::LossRecord};

    let mut store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_run("analysis-direct", 1, "0.1.0-test").unwrap();

    let metrics = SimulationMetrics { total_loss: 12.0, mean_loss: 4.0, max_loss: 8.0, ..Default::default() };
    store.insert_result("analysis-direct", 7, &metrics).unwrap();
    let records = [
        LossRecord { run_id: 1, attack_id: 1, cost: 4.0 },
        LossRecord { run_id: 3, attack_id: 1, cost: 8.0 },
    ];
    store.insert_loss_events("analysis-direct", 7, &records).unwrap();

    assert_eq!(store.mean_loss_for_company("analysis-direct", 7).unwrap(), Some(4.0));
    assert_eq!(store.loss_events("analysis-direct", 7).unwrap(), records);
    assert_eq!(store.results("analysis-direct").unwrap()[0].metrics, metrics);
}
