use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::loss::mse;
use rand::rngs::StdRng;
use rlab_candle_lm::{
    learning_module::{ActorCriticParams, SharedTrunkActorCriticLM},
    tensors::{PolicyLoss, Returns, ValueLoss, action_batch, observation_batch},
};
use rlab_core::{
    agents::Agent,
    env::{Env, EnvironmentDescription},
    utils::returns::discount_and_normalize,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorCriticOptions {
    pub alpha_actor: f64,
    pub alpha_critic: f64,
    pub gamma: f32,
    pub hidden_widths: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grad_norm: Option<f32>,
}

/// Shared-trunk actor-critic updated once per episode: first the actor against the critic's
/// (frozen) value estimates, then the critic against the normalized discounted returns.
pub struct ActorCritic {
    gamma: f32,
    module: SharedTrunkActorCriticLM,
    device: Device,
}

impl ActorCritic {
    pub fn new(
        description: &EnvironmentDescription,
        options: &ActorCriticOptions,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let params = ActorCriticParams {
            hidden_layers: options.hidden_widths.clone(),
            alpha_actor: options.alpha_actor,
            alpha_critic: options.alpha_critic,
            max_grad_norm: options.max_grad_norm,
        };
        let module = SharedTrunkActorCriticLM::build(
            description.observation_size(),
            description.action_size(),
            &params,
            device,
            rng,
        )?;
        Ok(Self {
            gamma: options.gamma,
            module,
            device: device.clone(),
        })
    }

    pub fn module(&self) -> &SharedTrunkActorCriticLM {
        &self.module
    }
}

impl Agent for ActorCritic {
    fn name(&self) -> &str {
        "ActorCritic"
    }

    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, _warmup: bool) -> Result<f32> {
        // the terminal observation is never scored, so observations line up with actions
        let mut observation = env.reset(rng);
        let mut observations = vec![];
        let mut actions = vec![];
        let mut rewards = vec![];
        loop {
            let action = self.module.get_action(&observation, rng)?;
            let sample = env.step(action)?;
            observations.push(observation);
            actions.push(action);
            rewards.push(sample.reward);
            if sample.done {
                break;
            }
            observation = sample.observation;
        }

        let states = observation_batch(&observations, &self.device)?;
        let actions = action_batch(&actions, &self.device)?;

        let values = self.module.values(&states)?.detach();
        let log_probs = self.module.log_probs(&states, &actions)?;
        let policy_loss = PolicyLoss(log_probs.mul(&values)?.sum_all()?.neg()?);
        self.module.update_actor(&policy_loss)?;

        let returns = Returns(Tensor::from_vec(
            discount_and_normalize(&rewards, self.gamma),
            rewards.len(),
            &self.device,
        )?);
        let value_loss = ValueLoss(mse(&self.module.values(&states)?, &returns)?);
        self.module.update_critic(&value_loss)?;
        debug!(
            steps = rewards.len(),
            policy_loss = policy_loss.to_scalar::<f32>()?,
            value_loss = value_loss.to_scalar::<f32>()?,
            "actor-critic update"
        );

        Ok(rewards.iter().sum())
    }
}
