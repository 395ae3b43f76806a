use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("unknown step: {0}")]
    UnknownStep(String),

    #[error(transparent)]
    Repo(#[from] crate::repo::RepoError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    Process(#[from] crate::subprocess::ProcessError),

    #[error("no test runner detected in {0}")]
    NoTestRunner(std::path::PathBuf),

    #[error("tests failed: {0}")]
    TestsFailed(String),

    #[error("merge blocked: {0}")]
    MergeBlocked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
