use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepoError {
    #[error(transparent)]
    Process(#[from] crate::subprocess::ProcessError),

    #[error("repository is in a detached HEAD state and no branch was requested")]
    DetachedHead,

    #[error("expected branch '{expected}' but repository is on '{actual}'")]
    WrongBranch { expected: String, actual: String },

    #[error("rebase of '{branch}' onto '{base}' conflicted")]
    RebaseConflict { branch: String, base: String },

    #[error("git command failed: {0}")]
    GitFailed(String),

    #[error("gh command failed: {0}")]
    GhFailed(String),

    #[error("pull request lookup/creation for branch '{0}' failed")]
    PrFailed(String),
}
