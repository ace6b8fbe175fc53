use rand::rngs::StdRng;
use rlab_core::{
    env::{Env, EnvironmentDescription, Observation, Sample, Space, check_action},
    error::{Result, RlError},
    rng::sample_uniform_range,
};
use std::f64::consts::PI;

const GRAVITY: f64 = 9.8;
const MASS_CART: f64 = 1.0;
const MASS_POLE: f64 = 0.1;
const TOTAL_MASS: f64 = MASS_CART + MASS_POLE;
// half the pole length, i.e. the distance to its centre of mass
const LENGTH: f64 = 0.5;
const POLE_MOMENT: f64 = MASS_POLE * LENGTH;
const FORCE_MAGNITUDE: f64 = 10.0;
// seconds between state updates
const TAU: f64 = 0.02;
const THETA_THRESHOLD_RADIANS: f64 = 12. * 2. * PI / 360.;
const X_THRESHOLD: f64 = 2.4;
const NUM_ACTIONS: usize = 2;

pub const WINNING_SCORE: f32 = 195.;
pub const MAX_EPISODE_LENGTH: usize = 200;

/// Cart position, cart velocity, pole angle (radians), pole angular velocity.
pub type CartPoleState = [f64; 4];

/// Classic pole balancing, integrated with explicit Euler steps. Action 1 pushes the cart
/// right, action 0 pushes it left.
#[derive(Debug, Clone)]
pub struct CartPole {
    max_episode_length: usize,
    steps: usize,
    done: bool,
    state: CartPoleState,
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl CartPole {
    pub fn new() -> Self {
        Self::with_max_episode_length(MAX_EPISODE_LENGTH)
    }

    pub fn with_max_episode_length(max_episode_length: usize) -> Self {
        Self {
            max_episode_length,
            steps: 0,
            done: true,
            state: [0.; 4],
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn max_episode_length(&self) -> usize {
        self.max_episode_length
    }

    pub fn state(&self) -> CartPoleState {
        self.state
    }

    fn observation(&self) -> Observation {
        self.state.iter().map(|x| *x as f32).collect()
    }

    fn is_out_of_bounds(x: f64, theta: f64) -> bool {
        !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD_RADIANS..=THETA_THRESHOLD_RADIANS).contains(&theta)
    }
}

/// One Euler step of the cart-pole equations of motion under `force`.
pub fn integrate(state: CartPoleState, force: f64) -> CartPoleState {
    let [x, x_dot, theta, theta_dot] = state;
    let cos_theta = theta.cos();
    let sin_theta = theta.sin();

    let temp = (force + POLE_MOMENT * theta_dot.powi(2) * sin_theta) / TOTAL_MASS;
    let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
        / (LENGTH * (4.0 / 3.0 - MASS_POLE * cos_theta.powi(2) / TOTAL_MASS));
    let x_acc = temp - POLE_MOMENT * theta_acc * cos_theta / TOTAL_MASS;

    [
        x + TAU * x_dot,
        x_dot + TAU * x_acc,
        theta + TAU * theta_dot,
        theta_dot + TAU * theta_acc,
    ]
}

impl Env for CartPole {
    fn name(&self) -> &str {
        "CartPole"
    }

    fn winning_score(&self) -> Option<f32> {
        Some(WINNING_SCORE)
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(Space::continuous(4), Space::Discrete(NUM_ACTIONS))
    }

    fn reset(&mut self, rng: &mut StdRng) -> Observation {
        let six_degrees = 6. * 2. * PI / 360.;
        self.state = [
            sample_uniform_range(rng, -0.5, 0.5),
            sample_uniform_range(rng, -0.5, 0.5),
            sample_uniform_range(rng, -six_degrees, six_degrees),
            sample_uniform_range(rng, -0.25, 0.25),
        ];
        self.steps = 0;
        self.done = false;
        self.observation()
    }

    fn step(&mut self, action: usize) -> Result<Sample> {
        check_action(action, NUM_ACTIONS)?;
        if self.done {
            return Err(RlError::EpisodeDone);
        }

        let force = if action == 1 {
            FORCE_MAGNITUDE
        } else {
            -FORCE_MAGNITUDE
        };
        self.state = integrate(self.state, force);
        self.steps += 1;
        let [x, _, theta, _] = self.state;
        self.done = self.steps >= self.max_episode_length || Self::is_out_of_bounds(x, theta);
        Ok(Sample::new(self.observation(), 1., self.done))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlab_core::rng::seeded;

    fn upright(max_episode_length: usize) -> CartPole {
        CartPole {
            max_episode_length,
            steps: 0,
            done: false,
            state: [0.; 4],
        }
    }

    #[test]
    fn reset_samples_within_documented_ranges() {
        let mut env = CartPole::new();
        let mut rng = seeded(9);
        for _ in 0..200 {
            let observation = env.reset(&mut rng);
            assert_eq!(observation.len(), 4);
            assert!(observation[0].abs() <= 0.5);
            assert!(observation[1].abs() <= 0.5);
            assert!((observation[2] as f64).abs() <= 6. * 2. * PI / 360. + 1e-6);
            assert!(observation[3].abs() <= 0.25);
            assert_eq!(env.steps(), 0);
        }
    }

    #[test]
    fn episode_is_capped() -> Result<()> {
        assert_eq!(CartPole::new().max_episode_length(), MAX_EPISODE_LENGTH);

        // pushing right, left, left, right keeps the pole close to upright
        let mut env = upright(12);
        let mut total = 0.;
        for (i, action) in [1, 0, 0, 1].iter().cycle().take(12).enumerate() {
            let sample = env.step(*action)?;
            total += sample.reward;
            assert_eq!(sample.done, i == 11, "step {i}");
        }
        assert_eq!(total, 12.);
        assert!(matches!(env.step(0), Err(RlError::EpisodeDone)));
        Ok(())
    }

    #[test]
    fn balanced_pole_runs_to_the_default_cap() -> Result<()> {
        let mut env = upright(CartPole::new().max_episode_length());
        let mut total = 0.;
        for step in 1..=MAX_EPISODE_LENGTH {
            let [_, _, theta, theta_dot] = env.state();
            let action = if theta + theta_dot > 0. { 1 } else { 0 };
            let sample = env.step(action)?;
            total += sample.reward;
            assert_eq!(sample.done, step == MAX_EPISODE_LENGTH, "step {step}");
        }
        assert_eq!(total, 200.);
        assert_eq!(env.steps(), 200);
        Ok(())
    }

    #[test]
    fn constant_push_fails_early() -> Result<()> {
        let mut env = upright(MAX_EPISODE_LENGTH);
        let mut steps = 0;
        loop {
            steps += 1;
            if env.step(1)?.done {
                break;
            }
        }
        assert!(steps < MAX_EPISODE_LENGTH);
        let [x, _, theta, _] = env.state();
        assert!(x.abs() > X_THRESHOLD || theta.abs() > THETA_THRESHOLD_RADIANS);
        Ok(())
    }

    #[test]
    fn pushing_right_tilts_the_pole_left() {
        let [_, x_dot, _, theta_dot] = integrate([0.; 4], FORCE_MAGNITUDE);
        assert!(x_dot > 0.);
        assert!(theta_dot < 0.);
    }

    #[test]
    fn rejects_unknown_actions() {
        let mut env = upright(10);
        assert!(matches!(
            env.step(2),
            Err(RlError::InvalidAction { action: 2, .. })
        ));
    }
}
