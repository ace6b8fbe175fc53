pub mod blackjack;
pub mod cart_pole;
pub mod mountain_car;
pub mod shaped_cart_pole;

use blackjack::Blackjack;
use cart_pole::CartPole;
use mountain_car::MountainCar;
use rand::rngs::StdRng;
use rlab_core::{
    env::{Env, EnvironmentDescription, Observation, Sample},
    error::Result,
};
use shaped_cart_pole::ShapedCartPole;

#[derive(Debug, Clone)]
pub enum EnvKind {
    Blackjack(Blackjack),
    CartPole(CartPole),
    ShapedCartPole(ShapedCartPole),
    MountainCar(MountainCar),
}

impl Env for EnvKind {
    fn name(&self) -> &str {
        match self {
            Self::Blackjack(env) => env.name(),
            Self::CartPole(env) => env.name(),
            Self::ShapedCartPole(env) => env.name(),
            Self::MountainCar(env) => env.name(),
        }
    }

    fn winning_score(&self) -> Option<f32> {
        match self {
            Self::Blackjack(env) => env.winning_score(),
            Self::CartPole(env) => env.winning_score(),
            Self::ShapedCartPole(env) => env.winning_score(),
            Self::MountainCar(env) => env.winning_score(),
        }
    }

    fn env_description(&self) -> EnvironmentDescription {
        match self {
            Self::Blackjack(env) => env.env_description(),
            Self::CartPole(env) => env.env_description(),
            Self::ShapedCartPole(env) => env.env_description(),
            Self::MountainCar(env) => env.env_description(),
        }
    }

    fn reset(&mut self, rng: &mut StdRng) -> Observation {
        match self {
            Self::Blackjack(env) => env.reset(rng),
            Self::CartPole(env) => env.reset(rng),
            Self::ShapedCartPole(env) => env.reset(rng),
            Self::MountainCar(env) => env.reset(rng),
        }
    }

    fn step(&mut self, action: usize) -> Result<Sample> {
        match self {
            Self::Blackjack(env) => env.step(action),
            Self::CartPole(env) => env.step(action),
            Self::ShapedCartPole(env) => env.step(action),
            Self::MountainCar(env) => env.step(action),
        }
    }

    fn reset_processed(&mut self, rng: &mut StdRng) -> Observation {
        match self {
            Self::Blackjack(env) => env.reset_processed(rng),
            Self::CartPole(env) => env.reset_processed(rng),
            Self::ShapedCartPole(env) => env.reset_processed(rng),
            Self::MountainCar(env) => env.reset_processed(rng),
        }
    }

    fn process_sample(&self, sample: &Sample, step: usize) -> Sample {
        match self {
            Self::Blackjack(env) => env.process_sample(sample, step),
            Self::CartPole(env) => env.process_sample(sample, step),
            Self::ShapedCartPole(env) => env.process_sample(sample, step),
            Self::MountainCar(env) => env.process_sample(sample, step),
        }
    }
}
