use crate::client::{RemoteClient, Task};
use crate::repo::RepoManager;
use crate::result_handler::AgentResult;
use std::path::PathBuf;

/// Everything a step needs: the repo it's operating in, the client to
/// persist task changes through, the task itself, and the agent's result.
///
/// Steps that mutate task fields (`create_pr` setting `pr_url`) write
/// through `client` immediately rather than staging changes locally - the
/// remote store is the only source of truth, matching `repo_manager.py`
/// and `result_handler.py`'s direct-SDK-call style.
pub struct StepContext {
    pub repo: RepoManager,
    pub client: RemoteClient,
    pub task: Task,
    pub result: AgentResult,
    pub task_dir: PathBuf,
}
