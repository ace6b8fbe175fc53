use crate::sequential::{Sequential, build_sequential};
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{
    Module, VarBuilder,
    ops::{log_softmax, softmax},
};
use rand::{
    distr::{Distribution, weighted::WeightedIndex},
    rngs::StdRng,
};

/// Draws an action index with probability proportional to `probs`.
pub fn sample_categorical(probs: &[f32], rng: &mut StdRng) -> Result<usize> {
    let distribution = WeightedIndex::new(probs)?;
    Ok(distribution.sample(rng))
}

/// Log-probability of `actions` (u32, one per row) under the softmax of `logits`.
pub fn gather_log_probs(logits: &Tensor, actions: &Tensor) -> Result<Tensor> {
    let log_probs = log_softmax(logits, 1)?;
    let log_probs = log_probs.gather(&actions.unsqueeze(1)?, 1)?.squeeze(1)?;
    Ok(log_probs)
}

/// Softmax of a single row of logits.
pub fn probabilities(logits: &Tensor) -> Result<Vec<f32>> {
    Ok(softmax(logits, 1)?.squeeze(0)?.to_vec1()?)
}

pub fn observation_row(observation: &[f32], device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_slice(observation, (1, observation.len()), device)?)
}

/// Policy network with a softmax over discrete actions on top of linear logits.
#[derive(Clone, Debug)]
pub struct CategoricalDistribution {
    action_size: usize,
    logits: Sequential,
    device: Device,
}

impl CategoricalDistribution {
    pub fn new(action_size: usize, logits: Sequential, device: Device) -> Self {
        Self {
            action_size,
            logits,
            device,
        }
    }

    pub fn build(
        input_dim: usize,
        action_size: usize,
        hidden_layers: &[usize],
        vb: &VarBuilder,
        device: Device,
        prefix: &str,
    ) -> Result<Self> {
        let mut layers = hidden_layers.to_vec();
        layers.push(action_size);
        let logits = build_sequential(input_dim, &layers, vb, prefix)?;
        Ok(Self::new(action_size, logits, device))
    }

    pub fn action_size(&self) -> usize {
        self.action_size
    }

    pub fn action_probs(&self, observation: &[f32]) -> Result<Vec<f32>> {
        let logits = self.logits.forward(&observation_row(observation, &self.device)?)?;
        probabilities(&logits)
    }

    /// Samples from the distribution, never takes the argmax.
    pub fn get_action(&self, observation: &[f32], rng: &mut StdRng) -> Result<usize> {
        sample_categorical(&self.action_probs(observation)?, rng)
    }

    pub fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let logits = self.logits.forward(states)?;
        gather_log_probs(&logits, actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;
    use rlab_core::rng::seeded;

    #[test]
    fn zero_weight_actions_are_never_sampled() -> Result<()> {
        let mut rng = seeded(0);
        for _ in 0..100 {
            assert_eq!(sample_categorical(&[0., 1., 0.], &mut rng)?, 1);
        }
        Ok(())
    }

    #[test]
    fn log_probs_pick_the_taken_action() -> Result<()> {
        let device = Device::Cpu;
        let logits = Tensor::from_slice(&[0f32, 0., 2f32.ln(), 0.], (2, 2), &device)?;
        let actions = Tensor::from_slice(&[1u32, 0], 2, &device)?;
        let log_probs: Vec<f32> = gather_log_probs(&logits, &actions)?.to_vec1()?;
        assert!((log_probs[0] - 0.5f32.ln()).abs() < 1e-6);
        assert!((log_probs[1] - (2f32 / 3.).ln()).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn action_probs_sum_to_one() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let policy = CategoricalDistribution::build(3, 4, &[8], &vb, Device::Cpu, "policy")?;
        let probs = policy.action_probs(&[0.1, -0.2, 0.3])?;
        assert_eq!(probs.len(), 4);
        assert!((probs.iter().sum::<f32>() - 1.).abs() < 1e-5);
        let action = policy.get_action(&[0.1, -0.2, 0.3], &mut seeded(1))?;
        assert!(action < policy.action_size());
        Ok(())
    }
}
