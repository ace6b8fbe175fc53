use anyhow::Result;
use rlab_core::training::{EpisodeProgress, TrainingHooks};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrainingResults<'a> {
    returns: &'a [f32],
    rolling_average_returns: &'a [f32],
}

/// Rewrites `<log_directory>/<agent>-<environment>.json` with every return seen so far each time
/// the training loop logs.
#[derive(Debug, Clone)]
pub struct ResultsWriter {
    path: PathBuf,
}

impl ResultsWriter {
    pub fn new(log_directory: &Path, agent: &str, environment: &str) -> Self {
        Self {
            path: log_directory.join(format!("{agent}-{environment}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TrainingHooks for ResultsWriter {
    fn post_episode_hook(&mut self, progress: &EpisodeProgress) -> Result<()> {
        progress.log();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let results = TrainingResults {
            returns: progress.returns,
            rolling_average_returns: progress.rolling_average_returns,
        };
        fs::write(&self.path, serde_json::to_string(&results)?)?;
        Ok(())
    }
}
