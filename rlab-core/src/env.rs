use crate::error::Result;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub type Observation = Vec<f32>;

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continuous {
        low: Option<Vec<f32>>,
        high: Option<Vec<f32>>,
        size: usize,
    },
}

impl Space {
    pub fn continuous(size: usize) -> Self {
        Self::Continuous {
            low: None,
            high: None,
            size,
        }
    }

    pub fn bounded(low: Vec<f32>, high: Vec<f32>) -> Self {
        let size = low.len();
        Self::Continuous {
            low: Some(low),
            high: Some(high),
            size,
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continuous { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    /// Observations handed out through the processed channel. Equal to `observation_space` for
    /// environments that do not shape their samples.
    pub processed_observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            processed_observation_space: observation_space.clone(),
            observation_space,
            action_space,
        }
    }

    pub fn with_processed_observation_space(mut self, space: Space) -> Self {
        self.processed_observation_space = space;
        self
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    pub fn processed_observation_size(&self) -> usize {
        self.processed_observation_space.size()
    }
}

/// The result of a single environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub observation: Observation,
    pub reward: f32,
    pub done: bool,
}

impl Sample {
    pub fn new(observation: Observation, reward: f32, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
        }
    }
}

pub trait Env {
    fn name(&self) -> &str;

    /// Rolling average return at which the environment counts as solved.
    fn winning_score(&self) -> Option<f32> {
        None
    }

    fn env_description(&self) -> EnvironmentDescription;

    fn reset(&mut self, rng: &mut StdRng) -> Observation;

    /// Advances the simulation. Fails on an out of range action or when the episode is already
    /// done; both are protocol violations of the caller.
    fn step(&mut self, action: usize) -> Result<Sample>;

    fn reset_processed(&mut self, rng: &mut StdRng) -> Observation {
        self.reset(rng)
    }

    /// Maps a raw sample onto the processed channel. `step` is the agent's global step counter.
    fn process_sample(&self, sample: &Sample, _step: usize) -> Sample {
        sample.clone()
    }
}

pub fn check_action(action: usize, num_actions: usize) -> Result<()> {
    if action >= num_actions {
        return Err(crate::error::RlError::InvalidAction {
            action,
            num_actions,
        });
    }
    Ok(())
}
