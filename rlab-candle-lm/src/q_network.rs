use crate::{
    distributions::categorical_distribution::observation_row,
    init::reseed_parameters,
    sequential::{Sequential, build_sequential},
};
use anyhow::{Result, anyhow};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{Module, VarBuilder, VarMap};
use rand::rngs::StdRng;
use std::path::Path;
use tracing::debug;

const PREFIX: &str = "q";

/// Action-value network: dense ReLU layers with a linear output of one value per action.
pub struct QNetwork {
    varmap: VarMap,
    model: Sequential,
    device: Device,
}

impl QNetwork {
    pub fn build(
        input_dim: usize,
        hidden_layers: &[usize],
        num_actions: usize,
        device: &Device,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let mut layers = hidden_layers.to_vec();
        layers.push(num_actions);
        let model = build_sequential(input_dim, &layers, &vb, PREFIX)?;
        reseed_parameters(&varmap, rng)?;
        Ok(Self {
            varmap,
            model,
            device: device.clone(),
        })
    }

    pub fn vars(&self) -> Vec<Var> {
        self.varmap.all_vars()
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `(batch, observation)` in, `(batch, num_actions)` out.
    pub fn forward(&self, observations: &Tensor) -> Result<Tensor> {
        Ok(self.model.forward(observations)?)
    }

    pub fn q_values(&self, observation: &[f32]) -> Result<Vec<f32>> {
        let output = self.forward(&observation_row(observation, &self.device)?)?;
        Ok(output.squeeze(0)?.to_vec1()?)
    }

    /// Index of the largest action value, the first one on ties.
    pub fn greedy_action(&self, observation: &[f32]) -> Result<usize> {
        let q_values = self.q_values(observation)?;
        let mut best = 0;
        for (action, value) in q_values.iter().enumerate() {
            if *value > q_values[best] {
                best = action;
            }
        }
        Ok(best)
    }

    /// `self = tau * source + (1 - tau) * self`, parameter by parameter. `tau = 1` copies.
    pub fn synchronise_from(&self, source: &QNetwork, tau: f64) -> Result<()> {
        let target_vars = self
            .varmap
            .data()
            .lock()
            .map_err(|_| anyhow!("target network lock is poisoned"))?;
        let source_vars = source
            .varmap
            .data()
            .lock()
            .map_err(|_| anyhow!("q network lock is poisoned"))?;
        for (name, target) in target_vars.iter() {
            let source_var = source_vars
                .get(name)
                .ok_or_else(|| anyhow!("parameter {name} is missing from the source network"))?;
            let blended = (source_var.as_tensor().affine(tau, 0.)?
                + target.as_tensor().affine(1. - tau, 0.)?)?;
            target.set(&blended)?;
        }
        debug!(tau, "synchronised target network");
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.varmap.save(path)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.varmap.load(path)?;
        Ok(())
    }
}
