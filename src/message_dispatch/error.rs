use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Process(#[from] crate::subprocess::ProcessError),

    #[error("dispatcher agent exited non-zero: {0}")]
    AgentFailed(String),

    #[error("failed to read dispatch state at {0}: {1}")]
    StateRead(std::path::PathBuf, #[source] serde_json::Error),

    #[error("failed to write dispatch state at {0}: {1}")]
    StateWrite(std::path::PathBuf, #[source] serde_json::Error),
}
