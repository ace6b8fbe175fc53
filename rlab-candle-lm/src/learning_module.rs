use crate::{
    distributions::categorical_distribution::{
        CategoricalDistribution, gather_log_probs, observation_row, probabilities,
        sample_categorical,
    },
    init::reseed_parameters,
    optimizer::{OptimizerKind, OptimizerWithMaxGrad},
    sequential::{Sequential, build_relu_stack, build_sequential},
    tensors::{PolicyLoss, ValueLoss},
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{Module, VarBuilder, VarMap};
use rand::rngs::StdRng;

/// A categorical policy and the Adam optimizer that trains it.
#[derive(Debug)]
pub struct PolicyGradientLM {
    pub policy: CategoricalDistribution,
    optimizer: OptimizerWithMaxGrad,
    updates: usize,
}

impl PolicyGradientLM {
    pub fn build(
        input_dim: usize,
        hidden_layers: &[usize],
        num_actions: usize,
        learning_rate: f64,
        max_grad_norm: Option<f32>,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let policy = CategoricalDistribution::build(
            input_dim,
            num_actions,
            hidden_layers,
            &vb,
            device.clone(),
            "policy",
        )?;
        reseed_parameters(&varmap, rng)?;
        let optimizer = OptimizerWithMaxGrad::new(
            OptimizerKind::adam(varmap.all_vars(), learning_rate)?,
            max_grad_norm,
            varmap.all_vars(),
        );
        Ok(Self {
            policy,
            optimizer,
            updates: 0,
        })
    }

    /// Optimizer steps taken so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn update(&mut self, loss: &PolicyLoss) -> Result<()> {
        self.optimizer.backward_step(loss)?;
        self.updates += 1;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ActorCriticParams {
    pub hidden_layers: Vec<usize>,
    pub alpha_actor: f64,
    pub alpha_critic: f64,
    pub max_grad_norm: Option<f32>,
}

/// A ReLU trunk feeding an actor head (action logits) and a critic head (one state value).
///
/// The actor optimizer owns the trunk and actor parameters, the critic optimizer the trunk and
/// critic parameters. Stepping one of them leaves the other head untouched while the trunk
/// follows whichever head is being trained.
#[derive(Debug)]
pub struct SharedTrunkActorCriticLM {
    trunk: Sequential,
    actor_head: Sequential,
    critic_head: Sequential,
    actor_optimizer: OptimizerWithMaxGrad,
    critic_optimizer: OptimizerWithMaxGrad,
    device: Device,
}

impl SharedTrunkActorCriticLM {
    pub fn build(
        input_dim: usize,
        num_actions: usize,
        params: &ActorCriticParams,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let trunk_varmap = VarMap::new();
        let actor_varmap = VarMap::new();
        let critic_varmap = VarMap::new();
        let trunk = build_relu_stack(
            input_dim,
            &params.hidden_layers,
            &VarBuilder::from_varmap(&trunk_varmap, DType::F32, device),
            "trunk",
        )?;
        let features = trunk.output_dim().unwrap_or(input_dim);
        let actor_head = build_sequential(
            features,
            &[num_actions],
            &VarBuilder::from_varmap(&actor_varmap, DType::F32, device),
            "actor",
        )?;
        let critic_head = build_sequential(
            features,
            &[1],
            &VarBuilder::from_varmap(&critic_varmap, DType::F32, device),
            "critic",
        )?;
        for varmap in [&trunk_varmap, &actor_varmap, &critic_varmap] {
            reseed_parameters(varmap, rng)?;
        }

        let actor_vars = [trunk_varmap.all_vars(), actor_varmap.all_vars()].concat();
        let critic_vars = [trunk_varmap.all_vars(), critic_varmap.all_vars()].concat();
        let actor_optimizer = OptimizerWithMaxGrad::new(
            OptimizerKind::adam(actor_vars.clone(), params.alpha_actor)?,
            params.max_grad_norm,
            actor_vars,
        );
        let critic_optimizer = OptimizerWithMaxGrad::new(
            OptimizerKind::adam(critic_vars.clone(), params.alpha_critic)?,
            params.max_grad_norm,
            critic_vars,
        );
        Ok(Self {
            trunk,
            actor_head,
            critic_head,
            actor_optimizer,
            critic_optimizer,
            device: device.clone(),
        })
    }

    pub fn actor_logits(&self, observations: &Tensor) -> Result<Tensor> {
        let features = self.trunk.forward(observations)?;
        Ok(self.actor_head.forward(&features)?)
    }

    /// One value per observation row.
    pub fn values(&self, observations: &Tensor) -> Result<Tensor> {
        let features = self.trunk.forward(observations)?;
        Ok(self.critic_head.forward(&features)?.squeeze(1)?)
    }

    pub fn log_probs(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        gather_log_probs(&self.actor_logits(observations)?, actions)
    }

    pub fn get_action(&self, observation: &[f32], rng: &mut StdRng) -> Result<usize> {
        let logits = self.actor_logits(&observation_row(observation, &self.device)?)?;
        sample_categorical(&probabilities(&logits)?, rng)
    }

    pub fn update_actor(&mut self, loss: &PolicyLoss) -> Result<()> {
        self.actor_optimizer.backward_step(loss)?;
        Ok(())
    }

    pub fn update_critic(&mut self, loss: &ValueLoss) -> Result<()> {
        self.critic_optimizer.backward_step(loss)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensors::observation_batch;
    use candle_nn::loss::mse;
    use rlab_core::rng::seeded;

    fn module() -> Result<SharedTrunkActorCriticLM> {
        let params = ActorCriticParams {
            hidden_layers: vec![8],
            alpha_actor: 0.01,
            alpha_critic: 0.01,
            max_grad_norm: None,
        };
        SharedTrunkActorCriticLM::build(3, 2, &params, &Device::Cpu, &mut seeded(0))
    }

    fn observations() -> Result<Tensor> {
        Ok(observation_batch(
            &[vec![1f32, 0., 0.5], vec![0., 1., -0.5]],
            &Device::Cpu,
        )?)
    }

    #[test]
    fn critic_step_leaves_the_actor_head_alone() -> Result<()> {
        let mut lm = module()?;
        let obs = observations()?;
        let actor_before: Vec<Vec<f32>> =
            lm.actor_head.forward(&Tensor::ones((1, 8), DType::F32, &Device::Cpu)?)?.to_vec2()?;
        let values_before: Vec<f32> = lm.values(&obs)?.to_vec1()?;

        let targets = Tensor::from_slice(&[5f32, -5.], 2, &Device::Cpu)?;
        let loss = ValueLoss(mse(&lm.values(&obs)?, &targets)?);
        lm.update_critic(&loss)?;

        let actor_after: Vec<Vec<f32>> =
            lm.actor_head.forward(&Tensor::ones((1, 8), DType::F32, &Device::Cpu)?)?.to_vec2()?;
        assert_eq!(actor_before, actor_after);
        assert_ne!(values_before, lm.values(&obs)?.to_vec1::<f32>()?);
        Ok(())
    }

    #[test]
    fn actor_step_leaves_the_critic_head_alone() -> Result<()> {
        let mut lm = module()?;
        let obs = observations()?;
        let features = Tensor::ones((1, 8), DType::F32, &Device::Cpu)?;
        let critic_before: Vec<Vec<f32>> = lm.critic_head.forward(&features)?.to_vec2()?;
        let logits_before: Vec<Vec<f32>> = lm.actor_logits(&obs)?.to_vec2()?;

        let actions = Tensor::from_slice(&[0u32, 1], 2, &Device::Cpu)?;
        let loss = PolicyLoss(lm.log_probs(&obs, &actions)?.sum_all()?.neg()?);
        lm.update_actor(&loss)?;

        let critic_after: Vec<Vec<f32>> = lm.critic_head.forward(&features)?.to_vec2()?;
        assert_eq!(critic_before, critic_after);
        assert_ne!(logits_before, lm.actor_logits(&obs)?.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn policy_updates_are_counted() -> Result<()> {
        let mut lm =
            PolicyGradientLM::build(3, &[4], 2, 0.01, None, &Device::Cpu, &mut seeded(1))?;
        let obs = observations()?;
        let actions = Tensor::from_slice(&[1u32, 1], 2, &Device::Cpu)?;
        let before = lm.policy.action_probs(&[1., 0., 0.5])?;
        for _ in 0..3 {
            let loss = PolicyLoss(lm.policy.log_probs(&obs, &actions)?.sum_all()?.neg()?);
            lm.update(&loss)?;
        }
        assert_eq!(lm.updates(), 3);
        assert_ne!(before, lm.policy.action_probs(&[1., 0., 0.5])?);
        Ok(())
    }

    #[test]
    fn actor_step_moves_probability_towards_rewarded_action() -> Result<()> {
        let mut lm = module()?;
        let obs = observations()?;
        let actions = Tensor::from_slice(&[1u32, 1], 2, &Device::Cpu)?;
        let before: Vec<f32> = lm.log_probs(&obs, &actions)?.to_vec1()?;
        for _ in 0..20 {
            let loss = PolicyLoss(lm.log_probs(&obs, &actions)?.sum_all()?.neg()?);
            lm.update_actor(&loss)?;
        }
        let after: Vec<f32> = lm.log_probs(&obs, &actions)?.to_vec1()?;
        assert!(after.iter().zip(before).all(|(a, b)| *a > b));
        Ok(())
    }
}
