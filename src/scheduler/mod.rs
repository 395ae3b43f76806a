//! Single-threaded cooperative tick loop owning all in-memory agent-pool
//! state.
//!
//! Grounded on the Python orchestrator's main loop (`orchestrator/` package
//! as a whole reads as one): per tick, claim work into idle pool capacity,
//! poll running agent subprocesses for exit, hand finished ones to the
//! result handler, then run the message dispatcher once. There is
//! deliberately no multi-threaded shared state - one tick finishes before
//! the next starts, so there's nothing to lock.

mod blueprint;
mod error;
mod worktree;

pub use blueprint::{AgentBlueprint, AgentPool, RunningInstance};
pub use error::SchedulerError;

use crate::client::RemoteClient;
use crate::config::AgentsConfig;
use crate::message_dispatch::MessageDispatcher;
use crate::prompt;
use crate::repo::RepoManager;
use crate::result_handler::ResultHandler;
use crate::subprocess::SubprocessManager;
use crate::task_thread;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Scheduler {
    pub pools: Vec<AgentPool>,
    client: RemoteClient,
    result_handler: ResultHandler,
    subprocess: SubprocessManager,
    agents_config: AgentsConfig,
    octopoid_dir: PathBuf,
    project_root: PathBuf,
    orchestrator_id: String,
    dispatcher: MessageDispatcher,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pools: Vec<AgentPool>,
        client: RemoteClient,
        result_handler: ResultHandler,
        subprocess: SubprocessManager,
        agents_config: AgentsConfig,
        octopoid_dir: PathBuf,
        project_root: PathBuf,
        orchestrator_id: String,
        dispatcher: MessageDispatcher,
    ) -> Self {
        Self {
            pools,
            client,
            result_handler,
            subprocess,
            agents_config,
            octopoid_dir,
            project_root,
            orchestrator_id,
            dispatcher,
        }
    }

    fn tasks_dir(&self) -> PathBuf {
        self.octopoid_dir.join("tasks")
    }

    fn threads_dir(&self) -> PathBuf {
        self.octopoid_dir.join("shared").join("threads")
    }

    /// Run exactly one tick: claim into idle capacity, poll running agents,
    /// run the message dispatcher once. Used directly by `octopoid tick`
    /// and called in a loop by `octopoid run`.
    pub async fn tick(&mut self) -> Result<(), SchedulerError> {
        self.claim_into_idle_capacity().await?;
        self.poll_running_instances().await?;
        self.dispatcher.run_once().await?;
        Ok(())
    }

    async fn claim_into_idle_capacity(&mut self) -> Result<(), SchedulerError> {
        for pool in &mut self.pools {
            while pool.idle_capacity() > 0 {
                let task = self
                    .client
                    .claim_task(&crate::client::ClaimRequest {
                        orchestrator_id: self.orchestrator_id.clone(),
                        agent_name: pool.blueprint.blueprint_name.clone(),
                        role_filter: pool
                            .blueprint
                            .role_filter
                            .clone()
                            .or_else(|| Some(pool.blueprint.role.clone())),
                        type_filter: pool.blueprint.type_filter.clone(),
                    })
                    .await?;

                let Some(task) = task else {
                    break;
                };

                info!(task_id = %task.id, blueprint = %pool.blueprint.blueprint_name, "claimed task");

                let task_dir = self.tasks_dir().join(format!("TASK-{}", task.id));
                std::fs::create_dir_all(&task_dir)?;

                let worktree_path = worktree::materialize(
                    self.subprocess.runner(),
                    &self.project_root,
                    &task.branch,
                )
                .await?;

                let rejection_history = task_thread::get_thread(&self.threads_dir(), &task.id);
                let template_path = self.octopoid_dir.join("prompts").join(format!("{}.md", pool.blueprint.role));
                let template_text = std::fs::read_to_string(&template_path)
                    .map_err(|_| SchedulerError::MissingPromptTemplate(pool.blueprint.role.clone()))?;
                let notes_path = task_dir.join("notes.md");
                let continuation_notes = std::fs::read_to_string(&notes_path).ok();

                let prompt = prompt::render_prompt(
                    &pool.blueprint.role,
                    &task,
                    &template_text,
                    "",
                    &rejection_history,
                    continuation_notes.as_deref(),
                    "scripts/",
                    &pool.blueprint.agent_hooks,
                )?;

                let child = spawn_agent(
                    &prompt,
                    &task_dir,
                    &worktree_path,
                    self.agents_config.agent_timeout,
                )?;

                let expected_queue = if task.queue == "claimed" {
                    None
                } else {
                    Some(task.queue.clone())
                };

                pool.running.push(RunningInstance {
                    task_id: task.id.clone(),
                    pid: child.id(),
                    child,
                    started_at: Instant::now(),
                    worktree_path,
                    expected_queue,
                });
            }
        }
        Ok(())
    }

    async fn poll_running_instances(&mut self) -> Result<(), SchedulerError> {
        for pool in &mut self.pools {
            let mut finished = Vec::new();
            for (i, instance) in pool.running.iter_mut().enumerate() {
                match instance.child.try_wait() {
                    Ok(Some(status)) => {
                        debug!(task_id = %instance.task_id, ?status, "agent process exited");
                        finished.push(i);
                    }
                    Ok(None) => {
                        let age = instance.started_at.elapsed();
                        if age > self.agents_config.soft_claim_limit {
                            warn!(
                                task_id = %instance.task_id,
                                age_secs = age.as_secs(),
                                limit_secs = self.agents_config.soft_claim_limit.as_secs(),
                                "claim has exceeded the soft claim limit"
                            );
                        }
                    }
                    Err(e) => {
                        warn!(task_id = %instance.task_id, error = %e, "failed to poll agent process");
                    }
                }
            }

            for &i in finished.iter().rev() {
                let instance = pool.running.remove(i);
                let task_dir = self.tasks_dir().join(format!("TASK-{}", instance.task_id));
                let repo = RepoManager::new(self.subprocess.runner(), instance.worktree_path.clone());

                let disposition = match &instance.expected_queue {
                    Some(expected) => {
                        self.result_handler
                            .handle_agent_result_via_flow(repo, &task_dir, expected)
                            .await?
                    }
                    None => {
                        self.result_handler
                            .handle_agent_result(repo, &task_dir, &self.agents_config)
                            .await?
                    }
                };

                if disposition == crate::result_handler::Disposition::RetryNextTick {
                    debug!(task_id = %instance.task_id, "result handler asked for a retry, but the process already exited");
                }
            }
        }
        Ok(())
    }
}

/// Spawn the agent subprocess with the conventional env vars and the
/// parent's `CLAUDECODE` marker unset so the spawned agent doesn't think
/// it's running nested inside another agent session.
fn spawn_agent(
    prompt: &str,
    task_dir: &std::path::Path,
    worktree: &std::path::Path,
    timeout: std::time::Duration,
) -> Result<tokio::process::Child, SchedulerError> {
    let mut command = tokio::process::Command::new("claude");
    command
        .arg("-p")
        .arg(prompt)
        .arg("--allowedTools")
        .arg("Read,Write,Edit,Glob,Grep,Bash,Skill")
        .arg("--max-turns")
        .arg("10")
        .current_dir(worktree)
        .env("TASK_DIR", task_dir)
        .env("TASK_WORKTREE", worktree)
        .env("RESULT_FILE", task_dir.join("result.json"))
        .env("OCTOPOID_AGENT_TIMEOUT_SECS", timeout.as_secs().to_string())
        .env_remove("CLAUDECODE")
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());

    Ok(command.spawn()?)
}
