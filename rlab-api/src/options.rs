use rlab_agents::{actor_critic::ActorCriticOptions, dqn::DqnOptions, reinforce::ReinforceOptions};
use rlab_core::{
    error::{Result, RlError},
    rng::DEFAULT_SEED,
    training::TrainingOptions,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub const MODEL_DIRECTORY: &str = "./models";
pub const LOG_DIRECTORY: &str = "./results/data";

/// Agent hyperparameters together with the training loop options they were tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig<T> {
    #[serde(flatten)]
    pub agent: T,
    pub training_options: TrainingOptions,
}

/// The random agent has nothing to tune.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomOptions {}

/// Keyed by environment name (`Env::name`).
pub type EnvironmentTable<T> = BTreeMap<String, AgentConfig<T>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsTable {
    pub model_directory: PathBuf,
    #[serde(default)]
    pub actor_critic: EnvironmentTable<ActorCriticOptions>,
    #[serde(default)]
    pub dqn: EnvironmentTable<DqnOptions>,
    #[serde(default)]
    pub random: EnvironmentTable<RandomOptions>,
    #[serde(default)]
    pub reinforce: EnvironmentTable<ReinforceOptions>,
}

impl OptionsTable {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Looks up the options of `agent` for `environment`.
pub fn lookup<'a, T>(
    table: &'a EnvironmentTable<T>,
    agent: &str,
    environment: &str,
) -> Result<&'a AgentConfig<T>> {
    table.get(environment).ok_or_else(|| RlError::MissingOptions {
        agent: agent.to_string(),
        environment: environment.to_string(),
    })
}

fn training_defaults(max_episodes: usize, log_period: usize) -> TrainingOptions {
    TrainingOptions {
        max_episodes,
        rolling_average_period: 100,
        log_period,
        log_directory: PathBuf::from(LOG_DIRECTORY),
        seed: DEFAULT_SEED,
        warmup_episodes: 0,
    }
}

fn blackjack_training() -> TrainingOptions {
    training_defaults(1000, 100)
}

fn cart_pole_training() -> TrainingOptions {
    training_defaults(1000, 10)
}

fn mountain_car_training() -> TrainingOptions {
    training_defaults(10_000, 10)
}

fn table<T>(entries: Vec<(&str, T, TrainingOptions)>) -> EnvironmentTable<T> {
    entries
        .into_iter()
        .map(|(environment, agent, training_options)| {
            (
                environment.to_string(),
                AgentConfig {
                    agent,
                    training_options,
                },
            )
        })
        .collect()
}

fn dqn_cart_pole() -> (DqnOptions, TrainingOptions) {
    let options = DqnOptions {
        hidden_widths: vec![8],
        alpha: 0.00001,
        gamma: 0.99,
        epsilon_initial: 1.,
        epsilon_minimum: 0.01,
        epsilon_decay: 0.995,
        tau: 0.5,
        target_network_update_period: 1,
        should_clip_loss: true,
        warmup: 0,
        replay_memory_capacity: 32_768,
        minibatch_size: 32,
        balanced_memory: None,
    };
    let training = TrainingOptions {
        max_episodes: 10_000,
        warmup_episodes: 1024,
        ..cart_pole_training()
    };
    (options, training)
}

impl Default for OptionsTable {
    fn default() -> Self {
        let actor_critic = table(vec![
            (
                "Blackjack",
                ActorCriticOptions {
                    alpha_actor: 0.01,
                    alpha_critic: 0.001,
                    gamma: 0.99,
                    hidden_widths: vec![8],
                    max_grad_norm: None,
                },
                blackjack_training(),
            ),
            (
                "CartPole",
                ActorCriticOptions {
                    alpha_actor: 0.00001,
                    alpha_critic: 0.00003,
                    gamma: 0.99,
                    hidden_widths: vec![8],
                    max_grad_norm: None,
                },
                TrainingOptions {
                    max_episodes: 10_000,
                    ..cart_pole_training()
                },
            ),
        ]);

        let (dqn_cart_pole, dqn_cart_pole_training) = dqn_cart_pole();
        let dqn = table(vec![
            (
                "Blackjack",
                DqnOptions {
                    hidden_widths: vec![2],
                    alpha: 0.03,
                    gamma: 0.99,
                    epsilon_initial: 1.,
                    epsilon_minimum: 0.01,
                    epsilon_decay: 0.99,
                    tau: 0.5,
                    target_network_update_period: 1,
                    should_clip_loss: true,
                    warmup: 0,
                    replay_memory_capacity: 512,
                    minibatch_size: 32,
                    balanced_memory: None,
                },
                TrainingOptions {
                    warmup_episodes: 256,
                    ..blackjack_training()
                },
            ),
            (
                "CartPole",
                dqn_cart_pole.clone(),
                dqn_cart_pole_training.clone(),
            ),
            ("ShapedCartPole", dqn_cart_pole, dqn_cart_pole_training),
            (
                "MountainCar",
                DqnOptions {
                    hidden_widths: vec![8],
                    alpha: 0.01,
                    gamma: 0.99,
                    epsilon_initial: 1.,
                    epsilon_minimum: 0.01,
                    epsilon_decay: 0.999,
                    tau: 0.9,
                    target_network_update_period: 1,
                    should_clip_loss: false,
                    warmup: 0,
                    replay_memory_capacity: 65_536,
                    minibatch_size: 32,
                    balanced_memory: None,
                },
                TrainingOptions {
                    warmup_episodes: 4096,
                    ..cart_pole_training()
                },
            ),
        ]);

        let random = table(vec![
            (
                "Blackjack",
                RandomOptions {},
                TrainingOptions {
                    max_episodes: 10_000,
                    rolling_average_period: 1000,
                    ..blackjack_training()
                },
            ),
            ("CartPole", RandomOptions {}, cart_pole_training()),
            ("ShapedCartPole", RandomOptions {}, cart_pole_training()),
            ("MountainCar", RandomOptions {}, mountain_car_training()),
        ]);

        let reinforce = table(vec![
            (
                "Blackjack",
                ReinforceOptions {
                    hidden_widths: vec![8],
                    alpha: 0.03,
                    gamma: 0.99,
                    max_grad_norm: None,
                },
                blackjack_training(),
            ),
            (
                "CartPole",
                ReinforceOptions {
                    hidden_widths: vec![4],
                    alpha: 0.003,
                    gamma: 0.99,
                    max_grad_norm: None,
                },
                TrainingOptions {
                    max_episodes: 2000,
                    ..cart_pole_training()
                },
            ),
            (
                "MountainCar",
                ReinforceOptions {
                    hidden_widths: vec![2],
                    alpha: 0.01,
                    gamma: 0.99,
                    max_grad_norm: None,
                },
                mountain_car_training(),
            ),
        ]);

        Self {
            model_directory: PathBuf::from(MODEL_DIRECTORY),
            actor_critic,
            dqn,
            random,
            reinforce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_tuned_pairing() {
        let table = OptionsTable::default();
        assert_eq!(table.actor_critic.len(), 2);
        assert_eq!(table.dqn.len(), 4);
        assert_eq!(table.random.len(), 4);
        assert_eq!(table.reinforce.len(), 3);

        let random = &table.random["Blackjack"].training_options;
        assert_eq!(random.max_episodes, 10_000);
        assert_eq!(random.rolling_average_period, 1000);
        assert_eq!(random.seed, DEFAULT_SEED);
        assert_eq!(table.dqn["MountainCar"].training_options.warmup_episodes, 4096);
    }

    #[test]
    fn missing_pairings_name_agent_and_environment() {
        let table = OptionsTable::default();
        let err = lookup(&table.actor_critic, "actor-critic", "MountainCar").unwrap_err();
        assert!(matches!(
            &err,
            RlError::MissingOptions { agent, environment }
                if agent == "actor-critic" && environment == "MountainCar"
        ));
        assert_eq!(
            err.to_string(),
            "options not specified for actor-critic in MountainCar"
        );
    }

    #[test]
    fn agent_options_are_flattened_next_to_training_options() -> serde_json::Result<()> {
        let table = OptionsTable::default();
        let json = serde_json::to_value(&table.reinforce["CartPole"])?;
        assert_eq!(json["hiddenWidths"], serde_json::json!([4]));
        assert_eq!(json["trainingOptions"]["maxEpisodes"], 2000);
        assert_eq!(json["trainingOptions"]["logDirectory"], LOG_DIRECTORY);
        Ok(())
    }

    #[test]
    fn tables_load_from_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("options.json");
        let mut custom = OptionsTable::default();
        custom.model_directory = dir.path().join("models");
        if let Some(config) = custom.random.get_mut("Blackjack") {
            config.training_options.max_episodes = 5;
        }
        fs::write(&path, serde_json::to_string_pretty(&custom)?)?;

        let loaded = OptionsTable::from_json_file(&path)?;
        assert_eq!(loaded.model_directory, dir.path().join("models"));
        assert_eq!(loaded.random["Blackjack"].training_options.max_episodes, 5);
        assert_eq!(loaded.dqn["Blackjack"], custom.dqn["Blackjack"]);
        Ok(())
    }
}
