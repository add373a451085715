use siloflow::{Scenario, ScenarioConfig};
use siloflow::{bench_neighbours, bench_silo_steps};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, default_value = "silo.yaml")]
    file_name: String,

    /// Time the neighbour finders instead of running a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_neighbours();
        bench_silo_steps();
        return Ok(());
    }

    let scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    let mut scenario = Scenario::build_scenario(scenario_cfg)?;
    let summary = scenario.run()?;

    info!(
        "{} steps, t = {:.4} s, flowed = {}, mean flow = {:.4}/s, peak pressure = {:.4}",
        summary.steps, summary.final_time, summary.flowed_total, summary.mean_flow, summary.peak_pressure
    );
    if let Some(t) = summary.stopped_at {
        info!("system stopped moving at t = {:.4} s", t);
    }

    Ok(())
}
