//! Crate-wide error type.
//!
//! Each subsystem owns a narrower `thiserror` enum at the point where it
//! touches the outside world (subprocess exit codes, HTTP status codes, YAML
//! parsing); `Error` is the aggregate those convert into at the boundaries
//! that the scheduler and CLI commands actually handle. Anywhere that just
//! needs to propagate uses `anyhow::Result` with `.context(...)` instead.

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP status error: {0}")]
    HttpStatus(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Flow(#[from] crate::flow::FlowError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    Step(#[from] crate::steps::StepError),

    #[error(transparent)]
    Repo(#[from] crate::repo::RepoError),

    #[error(transparent)]
    Subprocess(#[from] crate::subprocess::ProcessError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
