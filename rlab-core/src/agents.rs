use crate::env::Env;
use anyhow::Result;
use rand::rngs::StdRng;
use std::path::Path;

pub trait Agent {
    fn name(&self) -> &str;

    /// Runs one full episode against `env`, learning along the way, and returns the summed
    /// (unshaped) reward. `warmup` marks episodes the training loop runs before the scored ones.
    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, warmup: bool) -> Result<f32>;

    /// Persists whatever state is needed to resume training. Agents without learned state have
    /// nothing to write.
    fn save(&self, _directory: &Path, _env: &dyn Env) -> Result<()> {
        Ok(())
    }
}
