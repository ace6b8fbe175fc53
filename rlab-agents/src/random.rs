use anyhow::Result;
use rand::rngs::StdRng;
use rlab_core::{
    agents::Agent,
    env::{Env, EnvironmentDescription},
    rng::sample_uniform,
};

/// Uniformly random actions, nothing learned. The baseline every other agent has to beat.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    num_actions: usize,
}

impl RandomAgent {
    pub fn new(description: &EnvironmentDescription) -> Self {
        Self {
            num_actions: description.action_size(),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str {
        "Random"
    }

    fn run_episode(&mut self, env: &mut dyn Env, rng: &mut StdRng, _warmup: bool) -> Result<f32> {
        env.reset(rng);
        let mut total_reward = 0.;
        loop {
            let sample = env.step(sample_uniform(rng, self.num_actions))?;
            total_reward += sample.reward;
            if sample.done {
                return Ok(total_reward);
            }
        }
    }
}
