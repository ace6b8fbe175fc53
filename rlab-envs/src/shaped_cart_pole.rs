use crate::cart_pole::CartPole;
use rand::rngs::StdRng;
use rlab_core::{
    env::{Env, EnvironmentDescription, Observation, Sample, Space},
    error::Result,
};

/// [`CartPole`] with a processed channel that punishes dropping the pole and rewards reaching
/// the step cap. The processed observation carries one extra `lost` dimension. Raw samples pass
/// through untouched.
#[derive(Debug, Clone)]
pub struct ShapedCartPole {
    inner: CartPole,
    pub failure_reward: f32,
    pub success_reward: f32,
}

impl Default for ShapedCartPole {
    fn default() -> Self {
        Self::new(CartPole::new())
    }
}

impl ShapedCartPole {
    pub fn new(inner: CartPole) -> Self {
        Self {
            inner,
            failure_reward: -1.,
            success_reward: 1.,
        }
    }

    pub fn with_rewards(mut self, failure_reward: f32, success_reward: f32) -> Self {
        self.failure_reward = failure_reward;
        self.success_reward = success_reward;
        self
    }

    fn with_lost_indicator(observation: &Observation, lost: bool) -> Observation {
        let mut processed = observation.clone();
        processed.push(lost as u8 as f32);
        processed
    }
}

impl Env for ShapedCartPole {
    fn name(&self) -> &str {
        "ShapedCartPole"
    }

    fn winning_score(&self) -> Option<f32> {
        self.inner.winning_score()
    }

    fn env_description(&self) -> EnvironmentDescription {
        let description = self.inner.env_description();
        let size = description.observation_size() + 1;
        description.with_processed_observation_space(Space::continuous(size))
    }

    fn reset(&mut self, rng: &mut StdRng) -> Observation {
        self.inner.reset(rng)
    }

    fn step(&mut self, action: usize) -> Result<Sample> {
        self.inner.step(action)
    }

    fn reset_processed(&mut self, rng: &mut StdRng) -> Observation {
        Self::with_lost_indicator(&self.inner.reset(rng), false)
    }

    fn process_sample(&self, sample: &Sample, _step: usize) -> Sample {
        if !sample.done {
            return Sample::new(
                Self::with_lost_indicator(&sample.observation, false),
                sample.reward,
                false,
            );
        }
        let lost = self.inner.steps() < self.inner.max_episode_length();
        let reward = if lost {
            self.failure_reward
        } else {
            self.success_reward
        };
        Sample::new(
            Self::with_lost_indicator(&sample.observation, lost),
            reward,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::rng::seeded;

    #[test]
    fn processed_channel_has_an_extra_dimension() {
        let mut env = ShapedCartPole::default();
        let description = env.env_description();
        assert_eq!(description.observation_size(), 4);
        assert_eq!(description.processed_observation_size(), 5);

        let observation = env.reset_processed(&mut seeded(3));
        assert_eq!(observation.len(), 5);
        assert_eq!(observation[4], 0.);
    }

    #[test]
    fn dropping_the_pole_is_punished() -> Result<()> {
        let mut env = ShapedCartPole::default();
        env.reset(&mut seeded(3));
        let mut sample = env.step(1)?;
        while !sample.done {
            let processed = env.process_sample(&sample, 0);
            assert_eq!(processed.reward, 1.);
            assert_eq!(processed.observation[4], 0.);
            sample = env.step(1)?;
        }
        // the raw reward stays unshaped
        assert_eq!(sample.reward, 1.);
        let processed = env.process_sample(&sample, 0);
        assert_eq!(processed.reward, -1.);
        assert_eq!(processed.observation[4], 1.);
        assert!(processed.done);
        Ok(())
    }

    #[test]
    fn surviving_to_the_cap_is_rewarded() -> Result<()> {
        let mut env =
            ShapedCartPole::new(CartPole::with_max_episode_length(1)).with_rewards(-5., 2.);
        env.reset(&mut seeded(0));
        let sample = env.step(0)?;
        assert!(sample.done);
        let processed = env.process_sample(&sample, 0);
        assert_eq!(processed.reward, 2.);
        assert_eq!(processed.observation[4], 0.);
        Ok(())
    }
}
