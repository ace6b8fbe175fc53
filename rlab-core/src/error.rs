use thiserror::Error;

/// Errors raised by environments, replay memories and the agent/environment factories.
///
/// Most of these signal a misuse of the reset/step protocol or a configuration mistake, and are
/// never recovered from: they are propagated up to the training loop and abort the run.
#[derive(Error, Debug)]
pub enum RlError {
    #[error("action {action} is not in range, expected an action below {num_actions}")]
    InvalidAction { action: usize, num_actions: usize },

    #[error("environment is done, reset it before stepping")]
    EpisodeDone,

    #[error("not enough cards left in the deck")]
    DeckExhausted,

    #[error("cannot sample {requested} transitions from a memory holding {available}")]
    InsufficientTransitions { requested: usize, available: usize },

    #[error("agent name not recognised: {0}")]
    UnknownAgent(String),

    #[error("environment name not recognised: {0}")]
    UnknownEnvironment(String),

    #[error("options not specified for {agent} in {environment}")]
    MissingOptions { agent: String, environment: String },

    #[error("{0} not implemented")]
    NotImplemented(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RlError>;
