//! risk-runner: headless cyber risk analysis runner.
//!
//! Usage:
//!   risk-runner --seed 12345 --companies 1000 --runs 10000 --db run.db
//!   risk-runner --seed 12345 --db :memory: --ipc-mode
//!   risk-runner --db run.db --run-id <id|latest> --ipc-mode

use anyhow::Result;
use cyber_risk_core::{
    config::SimConfig,
    engine::{AnalysisEngine, RunSummary},
    metrics::SimulationMetrics,
    resolver::ParameterResolver,
    rng::SimRng,
    simulator::{loss_log_file_name, write_loss_log_csv, CostPolicy, CyberRiskSimulator},
    stats::StatsCache,
    store::SimStore,
    types::{Industry, RevenueBand},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetSummary,
    GetResultsById {
        company_id: u64,
    },
    GetResultsBySegmentation {
        #[serde(default)]
        revenue:  Vec<String>,
        #[serde(default)]
        industry: Vec<String>,
    },
    Simulate {
        industry: String,
        revenue:  f64,
        runs:     Option<usize>,
        seed:     Option<u64>,
        #[serde(default)]
        clamp_negative_costs: bool,
        #[serde(default)]
        export_csv: bool,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct RunState {
    run_id:    String,
    companies: i64,
    results:   i64,
    avg_mean_loss:      Option<f64>,
    max_p95_loss:       Option<f64>,
}

#[derive(serde::Serialize)]
struct SimulateReply {
    industry: Industry,
    band:     RevenueBand,
    runs:     usize,
    metrics:  SimulationMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    exported: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let data_dir = str_arg(&args, "--data-dir").unwrap_or("./data");

    let mut config = SimConfig::load(data_dir)?;
    config.num_companies = parse_arg(&args, "--companies", config.num_companies);
    config.num_runs = parse_arg(&args, "--runs", config.num_runs);
    if has_flag(&args, "--clamp-negative-costs") {
        config.clamp_negative_costs = true;
    }
    if has_flag(&args, "--export-losses") {
        config.export_loss_log = true;
    }
    let db = str_arg(&args, "--db").map_or_else(|| config.db_path.clone(), str::to_string);
    let existing_run = str_arg(&args, "--run-id").map(str::to_string);

    if !ipc_mode {
        println!("Cyber Risk Simulator: risk-runner");
        println!("  seed:       {seed}");
        println!("  companies:  {}", config.num_companies);
        println!("  runs:       {}", config.num_runs);
        println!("  db:         {db}");
        println!("  stats:      {}", config.stats_path.display());
        println!();
    }

    let store = SimStore::open(&db)?;
    store.migrate()?;
    let stats = StatsCache::new(config.stats_path.clone());
    log::debug!("stats table will be read from {}", stats.path().display());

    if let Some(requested) = existing_run {
        // "latest" picks the most recently started run in the database.
        let run_id = if requested == "latest" {
            store
                .latest_run_id()?
                .ok_or_else(|| anyhow::anyhow!("no runs recorded in {db}"))?
        } else {
            requested
        };
        if store.run_seed(&run_id)?.is_none() {
            anyhow::bail!("run {run_id} not found in {db}");
        }
        if ipc_mode {
            return run_ipc_loop(&store, &run_id, &config, &stats);
        }
        print_summary(&store, &run_id, None)?;
        return Ok(());
    }

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4().simple());
    let mut engine = AnalysisEngine::build(run_id.clone(), seed, config.clone(), store, stats.get()?)?;
    let summary = engine.run()?;

    if ipc_mode {
        run_ipc_loop(&engine.store, &run_id, &config, &stats)?;
    } else {
        print_summary(&engine.store, &run_id, Some(summary))?;
    }

    Ok(())
}

fn run_ipc_loop(store: &SimStore, run_id: &str, config: &SimConfig, stats: &StatsCache) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }

        let reply = match handle_command(store, run_id, config, stats, cmd) {
            Ok(v) => v,
            Err(e) => {
                log::error!("error: {e}");
                serde_json::json!({ "error": e.to_string() })
            }
        };
        writeln!(stdout, "{}", reply)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(
    store:  &SimStore,
    run_id: &str,
    config: &SimConfig,
    stats:  &StatsCache,
    cmd:    IpcCommand,
) -> Result<serde_json::Value> {
    let reply = match cmd {
        IpcCommand::GetSummary => serde_json::to_value(build_run_state(store, run_id)?)?,
        IpcCommand::GetResultsById { company_id } => {
            match store.mean_loss_for_company(run_id, company_id)? {
                Some(mean) => {
                    log::info!("average simulation cost for company_id={company_id} is: {mean}");
                    serde_json::json!({ "average simulation cost": mean })
                }
                None => {
                    log::debug!("no company found");
                    serde_json::json!({ "error": "no company found" })
                }
            }
        }
        IpcCommand::GetResultsBySegmentation { revenue, industry } => {
            let bands = split_list(&revenue)
                .map(|s| s.parse::<RevenueBand>())
                .collect::<Result<Vec<_>, _>>()?;
            let industries = split_list(&industry)
                .map(|s| s.parse::<Industry>())
                .collect::<Result<Vec<_>, _>>()?;
            match store.average_mean_loss_by_segmentation(run_id, &bands, &industries)? {
                Some(avg) => {
                    log::info!("average simulation cost for companies in the given segmentation is: {avg}");
                    serde_json::json!({ "average simulation cost": avg })
                }
                None => {
                    log::warn!("no companies found");
                    serde_json::json!({ "error": "no companies found" })
                }
            }
        }
        IpcCommand::Simulate { industry, revenue, runs, seed, clamp_negative_costs, export_csv } => {
            let industry: Industry = industry.parse()?;
            let runs = runs.unwrap_or(config.num_runs);
            let resolver = ParameterResolver::new(stats.get()?);
            let policy = if clamp_negative_costs {
                CostPolicy::ClampAtZero
            } else {
                config.cost_policy()
            };
            let simulator = CyberRiskSimulator::new(industry, revenue, runs, &resolver)?
                .with_cost_policy(policy);
            let band = cyber_risk_core::revenue::classify(revenue)?;
            let mut rng = SimRng::from_seed(seed.unwrap_or(0));

            let (metrics, exported) = if export_csv {
                let outcome = simulator.run_detailed(&mut rng);
                let file_name = loss_log_file_name(&chrono::Local::now());
                let file = std::fs::File::create(&file_name)?;
                write_loss_log_csv(file, &outcome.loss_log)?;
                log::debug!("saved {} loss rows to {file_name}", outcome.loss_log.len());
                (outcome.metrics, Some(file_name))
            } else {
                (simulator.run(&mut rng), None)
            };

            serde_json::to_value(SimulateReply { industry, band, runs, metrics, exported })?
        }
        IpcCommand::Quit => serde_json::Value::Null,
    };
    Ok(reply)
}

fn build_run_state(store: &SimStore, run_id: &str) -> Result<RunState> {
    let results = store.results(run_id)?;
    let avg_mean_loss = if results.is_empty() {
        None
    } else {
        Some(results.iter().map(|r| r.metrics.mean_loss).sum::<f64>() / results.len() as f64)
    };
    let max_p95_loss = results
        .iter()
        .map(|r| r.metrics.percentile_95_loss)
        .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.max(x))));

    Ok(RunState {
        run_id:    run_id.to_string(),
        companies: store.company_count(run_id)?,
        results:   results.len() as i64,
        avg_mean_loss,
        max_p95_loss,
    })
}

fn print_summary(store: &SimStore, run_id: &str, summary: Option<RunSummary>) -> Result<()> {
    let state = build_run_state(store, run_id)?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {run_id}");
    println!("  companies:       {}", state.companies);
    println!("  results:         {}", state.results);
    if let Some(s) = summary {
        println!("  simulated:       {}", s.simulated);
        println!("  skipped:         {}", s.skipped);
    }
    println!("  loss rows:       {}", store.loss_event_count(run_id)?);
    match state.avg_mean_loss {
        Some(avg) => println!("  avg mean loss:   {avg:.3}M"),
        None      => println!("  avg mean loss:   (no results)"),
    }

    println!();
    println!("=== MEAN LOSS BY SEGMENT ===");
    for industry in Industry::ALL {
        let cells: Vec<String> = RevenueBand::ALL
            .iter()
            .map(|band| {
                match store.average_mean_loss_by_segmentation(run_id, &[*band], &[industry]) {
                    Ok(Some(v)) => format!("{band:>4}: {v:>8.3}"),
                    Ok(None)    => format!("{band:>4}: {:>8}", "-"),
                    Err(e)      => format!("{band:>4}: error ({e})"),
                }
            })
            .collect();
        println!("  {:<14} {}", industry.as_str(), cells.join("  "));
    }
    Ok(())
}

/// Accept both `["100M", "500M"]` and `["100M,500M"]`.
fn split_list(items: &[String]) -> impl Iterator<Item = &str> {
    items
        .iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
