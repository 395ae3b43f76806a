use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("failed to read flow file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse flow file {0}: {1}")]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("flow '{0}' has no transitions")]
    Empty(String),

    #[error("malformed transition key: '{0}' (expected \"<from> -> <to>\")")]
    InvalidTransitionKey(String),

    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    #[error("flow '{flow}' has unreachable state '{state}' (no path from incoming)")]
    Unreachable { flow: String, state: String },

    #[error("no flow named '{0}' found")]
    NotFound(String),
}
