use anyhow::Result;
use clap::Parser;
use rlab_api::{
    builders::{agent::AGENT_NAMES, env::ENVIRONMENT_NAMES},
    options::OptionsTable,
    run,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Trains one agent on one environment and saves it once training stops.
#[derive(Parser, Debug)]
#[command(name = "rlab", version, about)]
struct Args {
    #[arg(value_parser = AGENT_NAMES)]
    agent: String,

    #[arg(value_parser = ENVIRONMENT_NAMES)]
    environment: String,

    /// Overrides the seed of the selected training options.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file replacing the built-in option tables.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Log every learning step.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let table = match &args.options {
        Some(path) => {
            info!("Loading options from {}", path.display());
            OptionsTable::from_json_file(path)?
        }
        None => OptionsTable::default(),
    };
    run(&args.agent, &args.environment, &table, args.seed)?;
    Ok(())
}
