// option tables, factories and the run entry point shared by the binary and the tests
pub mod builders;
pub mod options;
pub mod results;

use anyhow::Result;
use builders::{agent::AgentSpec, env::build_env};
use candle_core::Device;
use options::OptionsTable;
use results::ResultsWriter;
use rlab_core::{
    agents::Agent,
    env::Env,
    rng::seeded,
    training::{TrainingReport, train},
};
use tracing::info;

/// Trains `agent` on `environment` with the options the table holds for that pairing, writes the
/// results artifact as it goes and saves the agent to the table's model directory.
pub fn run(
    agent: &str,
    environment: &str,
    table: &OptionsTable,
    seed: Option<u64>,
) -> Result<TrainingReport> {
    let mut env = build_env(environment)?;
    let spec = AgentSpec::resolve(agent, env.name(), table)?;
    let mut training_options = spec.training_options().clone();
    if let Some(seed) = seed {
        training_options.seed = seed;
    }

    let mut rng = seeded(training_options.seed);
    let mut agent = spec.build(&env.env_description(), &Device::Cpu, &mut rng)?;

    info!("Training options: {}", serde_json::to_string(&training_options)?);
    info!("Environment: {}", env.name());
    match env.winning_score() {
        Some(score) => info!("Score to beat: {score}"),
        None => info!("Score to beat: [not set]"),
    }

    let mut writer = ResultsWriter::new(&training_options.log_directory, agent.name(), env.name());
    let report = train(&mut env, &mut agent, &training_options, &mut rng, &mut writer)?;
    if report.won {
        info!("You won!");
    } else {
        info!("You lost.");
    }

    agent.save(&table.model_directory, &env)?;
    Ok(report)
}
