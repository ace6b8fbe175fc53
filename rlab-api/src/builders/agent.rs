use crate::options::{AgentConfig, EnvironmentTable, OptionsTable, RandomOptions, lookup};
use anyhow::Result;
use candle_core::Device;
use rand::rngs::StdRng;
use rlab_agents::{
    AgentKind,
    actor_critic::{ActorCritic, ActorCriticOptions},
    dqn::{Dqn, DqnOptions},
    random::RandomAgent,
    reinforce::{Reinforce, ReinforceOptions},
};
use rlab_core::{
    env::EnvironmentDescription,
    error::{self, RlError},
    training::TrainingOptions,
};
use serde::Serialize;
use tracing::info;

/// Agent names accepted on the command line. The last two are recognised but never built.
pub const AGENT_NAMES: [&str; 6] = ["random", "dqn", "reinforce", "actor-critic", "a3c", "ddpg"];

/// An agent name resolved against the options table, ready to be built for an environment.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentSpec {
    Random(AgentConfig<RandomOptions>),
    Dqn(AgentConfig<DqnOptions>),
    Reinforce(AgentConfig<ReinforceOptions>),
    ActorCritic(AgentConfig<ActorCriticOptions>),
}

fn selected<T: Clone + Serialize>(
    table: &EnvironmentTable<T>,
    agent: &str,
    environment: &str,
) -> error::Result<AgentConfig<T>> {
    let config = lookup(table, agent, environment)?;
    info!(
        "{agent} options for {environment}: {}",
        serde_json::to_string(config)?
    );
    Ok(config.clone())
}

impl AgentSpec {
    /// `environment` is the `Env::name` the option tables are keyed by.
    pub fn resolve(agent: &str, environment: &str, table: &OptionsTable) -> error::Result<Self> {
        match agent {
            "random" => Ok(Self::Random(selected(&table.random, agent, environment)?)),
            "dqn" => Ok(Self::Dqn(selected(&table.dqn, agent, environment)?)),
            "reinforce" => Ok(Self::Reinforce(selected(
                &table.reinforce,
                agent,
                environment,
            )?)),
            "actor-critic" => Ok(Self::ActorCritic(selected(
                &table.actor_critic,
                agent,
                environment,
            )?)),
            "a3c" | "ddpg" => Err(RlError::NotImplemented(agent.to_string())),
            other => Err(RlError::UnknownAgent(other.to_string())),
        }
    }

    pub fn training_options(&self) -> &TrainingOptions {
        match self {
            Self::Random(config) => &config.training_options,
            Self::Dqn(config) => &config.training_options,
            Self::Reinforce(config) => &config.training_options,
            Self::ActorCritic(config) => &config.training_options,
        }
    }

    pub fn build(
        &self,
        description: &EnvironmentDescription,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<AgentKind> {
        let agent = match self {
            Self::Random(_) => AgentKind::Random(RandomAgent::new(description)),
            Self::Dqn(config) => {
                AgentKind::Dqn(Dqn::new(description, config.agent.clone(), device, rng)?)
            }
            Self::Reinforce(config) => {
                AgentKind::Reinforce(Reinforce::new(description, &config.agent, device, rng)?)
            }
            Self::ActorCritic(config) => AgentKind::ActorCritic(ActorCritic::new(
                description,
                &config.agent,
                device,
                rng,
            )?),
        };
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::{agents::Agent, env::Env, rng::seeded};
    use rlab_envs::cart_pole::CartPole;

    #[test]
    fn names_resolve_to_their_tables() -> error::Result<()> {
        let table = OptionsTable::default();
        let spec = AgentSpec::resolve("reinforce", "CartPole", &table)?;
        assert_eq!(spec, AgentSpec::Reinforce(table.reinforce["CartPole"].clone()));
        assert_eq!(spec.training_options().max_episodes, 2000);
        Ok(())
    }

    #[test]
    fn declared_but_unimplemented_agents_fail() {
        let table = OptionsTable::default();
        for name in ["a3c", "ddpg"] {
            assert!(matches!(
                AgentSpec::resolve(name, "CartPole", &table),
                Err(RlError::NotImplemented(agent)) if agent == name
            ));
        }
    }

    #[test]
    fn unknown_agents_and_missing_pairings_fail() {
        let table = OptionsTable::default();
        assert!(matches!(
            AgentSpec::resolve("sarsa", "CartPole", &table),
            Err(RlError::UnknownAgent(_))
        ));
        assert!(matches!(
            AgentSpec::resolve("actor-critic", "MountainCar", &table),
            Err(RlError::MissingOptions { .. })
        ));
    }

    #[test]
    fn built_agents_carry_their_names() -> Result<()> {
        let table = OptionsTable::default();
        let env = CartPole::new();
        let mut rng = seeded(1);
        let names: Vec<String> = AGENT_NAMES[..4]
            .iter()
            .map(|name| -> Result<String> {
                let spec = AgentSpec::resolve(name, env.name(), &table)?;
                let agent = spec.build(&env.env_description(), &Device::Cpu, &mut rng)?;
                Ok(agent.name().to_string())
            })
            .collect::<Result<_>>()?;
        assert_eq!(names, ["Random", "DQN", "Reinforce", "ActorCritic"]);
        Ok(())
    }
}
