use crate::{agents::Agent, env::Env, utils::returns::mean};
use anyhow::Result;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingOptions {
    pub max_episodes: usize,
    /// Window of the rolling average, and the number of episodes that must have run before a
    /// win can be declared.
    pub rolling_average_period: usize,
    pub log_period: usize,
    pub log_directory: PathBuf,
    pub seed: u64,
    pub warmup_episodes: usize,
}

/// What the hooks get to see whenever the training loop decides to log.
pub struct EpisodeProgress<'a> {
    pub episode: usize,
    pub returns: &'a [f32],
    pub rolling_average_returns: &'a [f32],
    pub won: bool,
}

impl EpisodeProgress<'_> {
    pub fn last_return(&self) -> Option<f32> {
        self.returns.last().copied()
    }

    pub fn rolling_average(&self) -> Option<f32> {
        self.rolling_average_returns.last().copied()
    }

    pub fn log(&self) {
        info!(
            episode = self.episode,
            last_return = self.last_return().unwrap_or_default(),
            rolling_average = self.rolling_average().unwrap_or_default(),
            "episode finished"
        );
    }
}

pub trait TrainingHooks {
    fn post_warmup_hook(&mut self, _warmup_episodes: usize) -> Result<()> {
        Ok(())
    }

    /// Called every `log_period` episodes and on the winning episode.
    fn post_episode_hook(&mut self, progress: &EpisodeProgress) -> Result<()>;
}

/// Hooks that only log through `tracing`.
#[derive(Debug, Default)]
pub struct DefaultTrainingHooks;

impl TrainingHooks for DefaultTrainingHooks {
    fn post_episode_hook(&mut self, progress: &EpisodeProgress) -> Result<()> {
        progress.log();
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub won: bool,
    pub returns: Vec<f32>,
    pub rolling_average_returns: Vec<f32>,
}

pub fn rolling_average(returns: &[f32], period: usize) -> f32 {
    let start = returns.len().saturating_sub(period.max(1));
    mean(&returns[start..])
}

/// Drives one agent against one environment until the environment's winning score is reached
/// or `max_episodes` have been played.
pub fn train<A: Agent + ?Sized, H: TrainingHooks>(
    env: &mut dyn Env,
    agent: &mut A,
    options: &TrainingOptions,
    rng: &mut StdRng,
    hooks: &mut H,
) -> Result<TrainingReport> {
    info!("Warming up for {} episodes...", options.warmup_episodes);
    for _ in 0..options.warmup_episodes {
        agent.run_episode(env, rng, true)?;
    }
    info!("Finished warming up");
    hooks.post_warmup_hook(options.warmup_episodes)?;

    let winning_score = env.winning_score();
    let mut report = TrainingReport::default();
    for episode in 1..=options.max_episodes {
        let episode_return = agent.run_episode(env, rng, false)?;
        report.returns.push(episode_return);
        let rolling_average_return = rolling_average(&report.returns, options.rolling_average_period);
        report.rolling_average_returns.push(rolling_average_return);

        let won = winning_score.is_some_and(|score| {
            episode >= options.rolling_average_period && rolling_average_return >= score
        });

        if episode % options.log_period.max(1) == 0 || won {
            hooks.post_episode_hook(&EpisodeProgress {
                episode,
                returns: &report.returns,
                rolling_average_returns: &report.rolling_average_returns,
                won,
            })?;
        }

        if won {
            report.won = true;
            break;
        }
    }
    Ok(report)
}
