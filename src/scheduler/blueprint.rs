use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Child;

/// One entry of `.octopoid/agents.yaml`: a pool of agents claiming a given
/// role, with its own concurrency cap and claim filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBlueprint {
    pub blueprint_name: String,
    pub role: String,
    pub max_instances: usize,
    #[serde(default)]
    pub role_filter: Option<String>,
    #[serde(default)]
    pub type_filter: Option<String>,
    /// Step names the prompt renderer should describe as "required before
    /// finishing" for this agent (e.g. `run_tests`, `create_pr`).
    #[serde(default)]
    pub agent_hooks: Vec<String>,
}

/// One spawned-and-running agent subprocess.
pub struct RunningInstance {
    pub task_id: String,
    pub pid: Option<u32>,
    pub child: Child,
    pub started_at: Instant,
    pub worktree_path: PathBuf,
    /// Set for gatekeeper-style claims, where the result handler needs to
    /// detect that the server's queue has moved since the claim.
    pub expected_queue: Option<String>,
}

/// A blueprint plus its currently-running instances.
pub struct AgentPool {
    pub blueprint: AgentBlueprint,
    pub running: Vec<RunningInstance>,
}

impl AgentPool {
    pub fn new(blueprint: AgentBlueprint) -> Self {
        Self {
            blueprint,
            running: Vec::new(),
        }
    }

    pub fn idle_capacity(&self) -> usize {
        self.blueprint
            .max_instances
            .saturating_sub(self.running.len())
    }
}
