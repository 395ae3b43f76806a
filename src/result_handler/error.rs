use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultHandlerError {
    #[error(transparent)]
    Step(#[from] crate::steps::StepError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientError),

    #[error(transparent)]
    Flow(#[from] crate::flow::FlowError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Signal returned to the scheduler describing what happened to the running
/// instance's task, so it knows whether to stop tracking the PID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The task transitioned (or was already gone); stop tracking the PID.
    Resolved,
    /// A step failed under the circuit-breaker threshold; keep tracking and
    /// retry the result handler again next tick.
    RetryNextTick,
}
