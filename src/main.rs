//! Benefit Engine CLI
//!
//! Evaluates benefit variables for one situation file and prints them as JSON

use anyhow::Context;
use benefit_engine::{BatchRunner, DataPaths, EngineConfig, Period, Situation};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "benefit-engine", about = "Compute household benefits for a situation file")]
struct Args {
    /// Situation JSON file
    situation: PathBuf,

    /// Evaluation date (YYYY-MM-DD)
    #[arg(short, long)]
    period: String,

    /// Variables to compute
    #[arg(short, long = "variable", default_values_t = [String::from("scholarship_min"), String::from("scholarship_max")])]
    variables: Vec<String>,

    /// Rule data directory (parameters.json, tables/)
    #[arg(long, default_value = benefit_engine::parameters::loader::DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Log every formula evaluation
    #[arg(long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let period: Period = args.period.parse().context("invalid --period")?;
    let config = if args.trace {
        EngineConfig::traced()
    } else {
        EngineConfig::default()
    };

    let runner = BatchRunner::scholarship(&DataPaths::new(&args.data))
        .with_context(|| format!("loading rule data from {}", args.data.display()))?
        .with_config(config);

    let situation = Situation::from_path(runner.system().registry(), &args.situation)
        .with_context(|| format!("loading situation {}", args.situation.display()))?;

    let variables: Vec<&str> = args.variables.iter().map(String::as_str).collect();
    let evaluation = runner.run(&situation, &variables, period)?;

    let output = evaluation.to_json(&situation.population, runner.system())?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    log::info!(
        "{} formula evaluations, cache hit rate {:.2}",
        evaluation.stats.evaluations,
        evaluation.stats.hit_rate()
    );
    Ok(())
}
