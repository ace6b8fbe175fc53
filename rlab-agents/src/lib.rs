pub mod actor_critic;
pub mod dqn;
pub mod random;
pub mod reinforce;

use actor_critic::ActorCritic;
use anyhow::Result;
use dqn::Dqn;
use rand::rngs::StdRng;
use random::RandomAgent;
use reinforce::Reinforce;
use rlab_core::{agents::Agent, env::Env};
use std::path::Path;

pub enum AgentKind {
    Random(RandomAgent),
    Dqn(Dqn),
    Reinforce(Reinforce),
    ActorCritic(ActorCritic),
}

impl Agent for AgentKind {
    fn name(&self) -> &str {
        match self {
            Self::Random(agent) => agent.name(),
            Self::Dqn(agent) => agent.name(),
            Self::Reinforce(agent) => agent.name(),
            Self::ActorCritic(agent) => agent.name(),
        }
    }

    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, warmup: bool) -> Result<f32> {
        match self {
            Self::Random(agent) => agent.run_episode(env, rng, warmup),
            Self::Dqn(agent) => agent.run_episode(env, rng, warmup),
            Self::Reinforce(agent) => agent.run_episode(env, rng, warmup),
            Self::ActorCritic(agent) => agent.run_episode(env, rng, warmup),
        }
    }

    fn save(&self, directory: &Path, env: &dyn Env) -> Result<()> {
        match self {
            Self::Random(agent) => agent.save(directory, env),
            Self::Dqn(agent) => agent.save(directory, env),
            Self::Reinforce(agent) => agent.save(directory, env),
            Self::ActorCritic(agent) => agent.save(directory, env),
        }
    }
}
