//! Step library: idempotent side-effect primitives a flow transition can
//! list under `runs`, invoked in declaration order.
//!
//! Grounded on `orchestrator/steps.py`'s registry pattern: a global,
//! read-only-after-init name -> function map, except here each step is an
//! async trait object since every real step does subprocess or network I/O.

mod context;
mod error;
mod git_steps;
mod planning;
mod remote_steps;

pub use context::StepContext;
pub use error::StepError;
pub use planning::escalate_to_planning;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError>;
}

static REGISTRY: Lazy<HashMap<&'static str, Arc<dyn Step>>> = Lazy::new(|| {
    let mut registry: HashMap<&'static str, Arc<dyn Step>> = HashMap::new();
    registry.insert("push_branch", Arc::new(git_steps::PushBranch));
    registry.insert("run_tests", Arc::new(git_steps::RunTests));
    registry.insert("create_pr", Arc::new(git_steps::CreatePr));
    registry.insert("merge_pr", Arc::new(git_steps::MergePr));
    registry.insert("rebase_on_main", Arc::new(git_steps::RebaseOnMain));
    registry.insert(
        "rebase_on_project_branch",
        Arc::new(git_steps::RebaseOnProjectBranch),
    );
    registry.insert("submit_to_server", Arc::new(remote_steps::SubmitToServer));
    registry.insert(
        "reject_with_feedback",
        Arc::new(remote_steps::RejectWithFeedback),
    );
    registry.insert(
        "post_review_comment",
        Arc::new(remote_steps::PostReviewComment),
    );
    registry
});

fn lookup(name: &str) -> Result<Arc<dyn Step>, StepError> {
    REGISTRY
        .get(name)
        .cloned()
        .ok_or_else(|| StepError::UnknownStep(name.to_string()))
}

/// Run `step_names` against `ctx`, in order, stopping at the first error
/// (mirrors `orchestrator/steps.py::execute_steps`).
pub async fn execute_steps(step_names: &[String], ctx: &mut StepContext) -> Result<(), StepError> {
    for name in step_names {
        let step = lookup(name)?;
        step.run(ctx).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_step_name_is_rejected() {
        assert!(matches!(
            lookup("does_not_exist"),
            Err(StepError::UnknownStep(_))
        ));
    }

    #[test]
    fn every_default_flow_step_resolves() {
        for name in ["rebase_on_main", "run_tests", "create_pr", "merge_pr"] {
            assert!(lookup(name).is_ok(), "missing step: {name}");
        }
    }
}
