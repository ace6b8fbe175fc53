use anyhow::{Result, bail};
use candle_core::{Device, Tensor};
use candle_nn::loss::mse;
use rand::rngs::StdRng;
use rlab_candle_lm::{
    optimizer::{OptimizerKind, OptimizerWithMaxGrad},
    q_network::QNetwork,
    tensors::{QLoss, action_batch, observation_batch},
};
use rlab_core::{
    agents::Agent,
    buffers::replay_memory::{
        BalancedReplayMemory, BasicReplayMemory, ReplayMemory, ReplayMemoryKind, Transition,
    },
    env::{Env, EnvironmentDescription},
    rng::{sample_uniform, sample_uniform_range},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, info};

const NAME: &str = "DQN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancedMemoryOptions {
    pub non_negative_capacity: usize,
    pub negative_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DqnOptions {
    pub hidden_widths: Vec<usize>,
    /// Learning rate.
    pub alpha: f64,
    /// Discount rate.
    pub gamma: f32,
    /// Set to 0 for a purely greedy policy.
    pub epsilon_initial: f64,
    pub epsilon_minimum: f64,
    /// Multiplicative decay per post-warmup decision. Set to 1 for a constant epsilon.
    pub epsilon_decay: f64,
    /// Blend rate of the target network, 1 copies the Q-network outright.
    pub tau: f64,
    /// Steps between target network syncs. 1 keeps both networks in lockstep.
    pub target_network_update_period: usize,
    pub should_clip_loss: bool,
    /// Steps of uniformly random play before learning starts.
    #[serde(default)]
    pub warmup: usize,
    pub replay_memory_capacity: usize,
    pub minibatch_size: usize,
    /// Stores negative-reward transitions in a pool of their own instead of a single FIFO.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balanced_memory: Option<BalancedMemoryOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DqnCheckpoint<M> {
    environment: String,
    options: DqnOptions,
    replay_memory: M,
    epsilon: f64,
    steps: usize,
}

/// TD targets of a minibatch. `bootstrap[i]` holds the target network's action values for the
/// next observation of `transitions[i]`; the value of the action actually taken is bootstrapped,
/// not the maximum. Terminal transitions target their raw reward.
pub fn td_targets(transitions: &[&Transition], bootstrap: &[Vec<f32>], gamma: f32) -> Vec<f32> {
    transitions
        .iter()
        .zip(bootstrap)
        .map(|(transition, next_values)| {
            if transition.done {
                transition.reward
            } else {
                transition.reward + gamma * next_values[transition.action]
            }
        })
        .collect()
}

pub struct Dqn {
    options: DqnOptions,
    num_actions: usize,
    q_network: QNetwork,
    target_network: QNetwork,
    optimizer: OptimizerWithMaxGrad,
    replay_memory: ReplayMemoryKind,
    epsilon: f64,
    steps: usize,
}

impl Dqn {
    /// The networks read the processed observations of the environment.
    pub fn new(
        description: &EnvironmentDescription,
        options: DqnOptions,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let input_dim = description.processed_observation_size();
        let num_actions = description.action_size();
        let q_network =
            QNetwork::build(input_dim, &options.hidden_widths, num_actions, device, rng)?;
        let target_network =
            QNetwork::build(input_dim, &options.hidden_widths, num_actions, device, rng)?;
        target_network.synchronise_from(&q_network, options.tau)?;
        let optimizer = OptimizerWithMaxGrad::new(
            OptimizerKind::sgd(q_network.vars(), options.alpha)?,
            None,
            q_network.vars(),
        );
        let replay_memory = match &options.balanced_memory {
            Some(balanced) => ReplayMemoryKind::from(BalancedReplayMemory::new(
                balanced.non_negative_capacity,
                balanced.negative_capacity,
            )),
            None => ReplayMemoryKind::from(BasicReplayMemory::new(options.replay_memory_capacity)),
        };
        Ok(Self {
            epsilon: options.epsilon_initial,
            options,
            num_actions,
            q_network,
            target_network,
            optimizer,
            replay_memory,
            steps: 0,
        })
    }

    /// Rebuilds an agent from what [`Agent::save`] wrote for `env` into `directory`.
    pub fn restore(
        directory: &Path,
        env: &dyn Env,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let stem = checkpoint_stem(env);
        let sidecar = fs::read_to_string(directory.join(format!("{stem}.json")))?;
        let checkpoint: DqnCheckpoint<ReplayMemoryKind> = serde_json::from_str(&sidecar)?;
        if checkpoint.environment != env.name() {
            bail!(
                "checkpoint was written for {}, not {}",
                checkpoint.environment,
                env.name()
            );
        }

        let mut dqn = Self::new(&env.env_description(), checkpoint.options, device, rng)?;
        dqn.q_network
            .load(directory.join(format!("{stem}-q-network.safetensors")))?;
        dqn.target_network
            .load(directory.join(format!("{stem}-target-network.safetensors")))?;
        dqn.replay_memory = checkpoint.replay_memory;
        dqn.epsilon = checkpoint.epsilon;
        dqn.steps = checkpoint.steps;
        info!(
            steps = dqn.steps,
            epsilon = dqn.epsilon,
            transitions = dqn.replay_memory.len(),
            "restored {stem}"
        );
        Ok(dqn)
    }

    pub fn options(&self) -> &DqnOptions {
        &self.options
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn replay_memory(&self) -> &ReplayMemoryKind {
        &self.replay_memory
    }

    pub fn q_network(&self) -> &QNetwork {
        &self.q_network
    }

    pub fn target_network(&self) -> &QNetwork {
        &self.target_network
    }

    fn is_warmup(&self) -> bool {
        self.steps < self.options.warmup
    }

    fn act(&mut self, observation: &[f32], rng: &mut StdRng) -> Result<usize> {
        let is_warmup = self.is_warmup();
        let should_act_random = is_warmup || sample_uniform_range(rng, 0., 1.) < self.epsilon;

        if !is_warmup {
            self.epsilon =
                (self.epsilon * self.options.epsilon_decay).max(self.options.epsilon_minimum);
        }

        if should_act_random {
            return Ok(sample_uniform(rng, self.num_actions));
        }
        self.q_network.greedy_action(observation)
    }

    fn learn(&mut self, rng: &mut StdRng) -> Result<()> {
        let device = self.q_network.device().clone();
        let transitions = self.replay_memory.sample(self.options.minibatch_size, rng)?;
        let batch_size = transitions.len();

        let next_observations: Vec<&[f32]> = transitions
            .iter()
            .map(|t| t.next_observation.as_slice())
            .collect();
        let bootstrap: Vec<Vec<f32>> = self
            .target_network
            .forward(&observation_batch(&next_observations, &device)?)?
            .to_vec2()?;
        let targets = Tensor::from_vec(
            td_targets(&transitions, &bootstrap, self.options.gamma),
            batch_size,
            &device,
        )?;

        let observations: Vec<&[f32]> = transitions
            .iter()
            .map(|t| t.observation.as_slice())
            .collect();
        let actions: Vec<usize> = transitions.iter().map(|t| t.action).collect();
        let predictions = self
            .q_network
            .forward(&observation_batch(&observations, &device)?)?
            .gather(&action_batch(&actions, &device)?.unsqueeze(1)?, 1)?
            .squeeze(1)?;

        let mut loss = mse(&predictions, &targets)?;
        if self.options.should_clip_loss {
            loss = loss.clamp(-1f32, 1f32)?;
        }
        let loss = QLoss(loss);
        debug!(step = self.steps, loss = loss.to_scalar::<f32>()?, "dqn update");
        self.optimizer.backward_step(&loss)?;

        let period = self.options.target_network_update_period.max(1);
        if self.steps >= self.options.warmup && (self.steps + 1) % period == 0 {
            self.target_network
                .synchronise_from(&self.q_network, self.options.tau)?;
        }
        Ok(())
    }
}

fn checkpoint_stem(env: &dyn Env) -> String {
    format!("{NAME}-{}", env.name())
}

impl Agent for Dqn {
    fn name(&self) -> &str {
        NAME
    }

    /// Warmup episodes of the training loop are ordinary learning episodes here, only the
    /// `warmup` option switches to uniform play.
    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, _warmup: bool) -> Result<f32> {
        let mut observation = env.reset_processed(rng);
        let mut base_return = 0.;
        loop {
            self.steps += 1;
            let action = self.act(&observation, rng)?;
            let sample = env.step(action)?;
            let processed = env.process_sample(&sample, self.steps);
            base_return += sample.reward;

            self.replay_memory.store(Transition {
                observation,
                action,
                reward: processed.reward,
                done: processed.done,
                next_observation: processed.observation.clone(),
            });
            if !self.is_warmup() && self.replay_memory.len() >= self.options.minibatch_size {
                self.learn(rng)?;
            }

            if processed.done {
                return Ok(base_return);
            }
            observation = processed.observation;
        }
    }

    fn save(&self, directory: &Path, env: &dyn Env) -> Result<()> {
        fs::create_dir_all(directory)?;
        let stem = checkpoint_stem(env);
        self.q_network
            .save(directory.join(format!("{stem}-q-network.safetensors")))?;
        self.target_network
            .save(directory.join(format!("{stem}-target-network.safetensors")))?;
        let checkpoint = DqnCheckpoint {
            environment: env.name().to_string(),
            options: self.options.clone(),
            replay_memory: &self.replay_memory,
            epsilon: self.epsilon,
            steps: self.steps,
        };
        fs::write(
            directory.join(format!("{stem}.json")),
            serde_json::to_string(&checkpoint)?,
        )?;
        info!(directory = %directory.display(), "saved {stem}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(action: usize, reward: f32, done: bool) -> Transition {
        Transition {
            observation: vec![0.],
            action,
            reward,
            done,
            next_observation: vec![1.],
        }
    }

    #[test]
    fn terminal_transitions_target_their_reward() {
        let terminal = transition(1, -0.75, true);
        let targets = td_targets(&[&terminal], &[vec![100., 200.]], 0.99);
        assert_eq!(targets, vec![-0.75]);
    }

    #[test]
    fn bootstrap_uses_the_action_taken() {
        let left = transition(0, 1., false);
        let right = transition(1, 1., false);
        let bootstrap = vec![vec![2., 10.], vec![2., 10.]];
        let targets = td_targets(&[&left, &right], &bootstrap, 0.5);
        assert_eq!(targets, vec![2., 6.]);
    }

    #[test]
    fn options_use_camel_case() -> Result<()> {
        let options: DqnOptions = serde_json::from_str(
            r#"{
                "hiddenWidths": [2],
                "alpha": 0.03,
                "gamma": 0.99,
                "epsilonInitial": 1,
                "epsilonMinimum": 0.01,
                "epsilonDecay": 0.99,
                "tau": 0.5,
                "targetNetworkUpdatePeriod": 1,
                "shouldClipLoss": true,
                "warmup": 0,
                "replayMemoryCapacity": 512,
                "minibatchSize": 32
            }"#,
        )?;
        assert_eq!(options.hidden_widths, vec![2]);
        assert_eq!(options.balanced_memory, None);
        Ok(())
    }
}
