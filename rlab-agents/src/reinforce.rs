use anyhow::Result;
use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rlab_candle_lm::{
    learning_module::PolicyGradientLM,
    tensors::{Logp, PolicyLoss, Returns, action_batch, observation_batch},
};
use rlab_core::{
    agents::Agent,
    env::{Env, EnvironmentDescription, Observation},
    utils::returns::discount_and_normalize,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReinforceOptions {
    pub hidden_widths: Vec<usize>,
    pub alpha: f64,
    pub gamma: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grad_norm: Option<f32>,
}

/// Monte-Carlo policy gradient: one optimizer step per finished episode.
pub struct Reinforce {
    gamma: f32,
    module: PolicyGradientLM,
    device: Device,
}

impl Reinforce {
    pub fn new(
        description: &EnvironmentDescription,
        options: &ReinforceOptions,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let module = PolicyGradientLM::build(
            description.observation_size(),
            &options.hidden_widths,
            description.action_size(),
            options.alpha,
            options.max_grad_norm,
            device,
            rng,
        )?;
        Ok(Self {
            gamma: options.gamma,
            module,
            device: device.clone(),
        })
    }

    pub fn module(&self) -> &PolicyGradientLM {
        &self.module
    }

    fn learn(
        &mut self,
        observations: &[Observation],
        actions: &[usize],
        rewards: &[f32],
    ) -> Result<()> {
        let states = observation_batch(observations, &self.device)?;
        let logp = Logp(
            self.module
                .policy
                .log_probs(&states, &action_batch(actions, &self.device)?)?,
        );
        let returns = Returns(Tensor::from_vec(
            discount_and_normalize(rewards, self.gamma),
            rewards.len(),
            &self.device,
        )?);
        let policy_loss = PolicyLoss(logp.mul(&returns)?.sum_all()?.neg()?);
        debug!(
            steps = rewards.len(),
            loss = policy_loss.to_scalar::<f32>()?,
            "reinforce update"
        );
        self.module.update(&policy_loss)
    }
}

impl Agent for Reinforce {
    fn name(&self) -> &str {
        "Reinforce"
    }

    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, _warmup: bool) -> Result<f32> {
        let mut observation = env.reset(rng);
        let mut observations = vec![];
        let mut actions = vec![];
        let mut rewards = vec![];
        loop {
            let action = self.module.policy.get_action(&observation, rng)?;
            let sample = env.step(action)?;
            observations.push(observation);
            actions.push(action);
            rewards.push(sample.reward);
            if sample.done {
                break;
            }
            observation = sample.observation;
        }

        self.learn(&observations, &actions, &rewards)?;
        Ok(rewards.iter().sum())
    }
}
