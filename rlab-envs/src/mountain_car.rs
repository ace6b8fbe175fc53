use rand::rngs::StdRng;
use rlab_core::{
    env::{Env, EnvironmentDescription, Observation, Sample, Space, check_action},
    error::{Result, RlError},
    rng::sample_uniform_range,
};

const MIN_POSITION: f64 = -1.2;
const MAX_POSITION: f64 = 0.6;
const MIN_STARTING_POSITION: f64 = -0.6;
const MAX_STARTING_POSITION: f64 = -0.4;
const MAX_SPEED: f64 = 0.07;
const GOAL_POSITION: f64 = 0.5;
const FORCE: f64 = 0.001;
const GRAVITY: f64 = 0.0025;
const NUM_ACTIONS: usize = 3;

pub const WINNING_SCORE: f32 = -140.;
// 200 steps is too short for a random policy to ever reach the flag
pub const MAX_EPISODE_LENGTH: usize = 1000;

/// An under-powered car in a valley. Action 0 accelerates left, 1 coasts, 2 accelerates right.
/// Every step costs -1 until the flag is reached.
#[derive(Debug, Clone)]
pub struct MountainCar {
    steps: usize,
    done: bool,
    position: f64,
    velocity: f64,
}

impl Default for MountainCar {
    fn default() -> Self {
        Self::new()
    }
}

impl MountainCar {
    pub fn new() -> Self {
        Self {
            steps: 0,
            done: true,
            position: 0.,
            velocity: 0.,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    fn observation(&self) -> Observation {
        vec![self.position as f32, self.velocity as f32]
    }
}

impl Env for MountainCar {
    fn name(&self) -> &str {
        "MountainCar"
    }

    fn winning_score(&self) -> Option<f32> {
        Some(WINNING_SCORE)
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::bounded(
                vec![MIN_POSITION as f32, -MAX_SPEED as f32],
                vec![MAX_POSITION as f32, MAX_SPEED as f32],
            ),
            Space::Discrete(NUM_ACTIONS),
        )
    }

    fn reset(&mut self, rng: &mut StdRng) -> Observation {
        self.position = sample_uniform_range(rng, MIN_STARTING_POSITION, MAX_STARTING_POSITION);
        self.velocity = 0.;
        self.steps = 0;
        self.done = false;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<Sample> {
        check_action(action, NUM_ACTIONS)?;
        if self.done {
            return Err(RlError::EpisodeDone);
        }

        let direction = action as f64 - 1.;
        let velocity = (self.velocity + direction * FORCE - (3. * self.position).cos() * GRAVITY)
            .clamp(-MAX_SPEED, MAX_SPEED);
        let position = (self.position + velocity).clamp(MIN_POSITION, MAX_POSITION);
        // the left wall absorbs all momentum
        self.velocity = if position <= MIN_POSITION { 0. } else { velocity };
        self.position = position;
        self.steps += 1;

        let reached_flag = position >= GOAL_POSITION;
        self.done = reached_flag || self.steps >= MAX_EPISODE_LENGTH;
        let reward = if reached_flag { 0. } else { -1. };
        Ok(Sample::new(self.observation(), reward, self.done))
    }
}
