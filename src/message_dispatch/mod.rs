//! Serial poll-and-dispatch loop for human -> agent control commands.
//!
//! Grounded on `orchestrator/message_dispatcher.py`: at most one
//! `to_actor="agent", type="action_command"` message is worked per tick, a
//! short-lived agent is spawned under a hard turn cap and a hard wall-clock
//! timeout to act on it, and a `worker_result` message is posted back to
//! the human inbox either way. Crash recovery for messages that got stuck
//! in `processing` (orchestrator restarted mid-dispatch) is a sweep that
//! runs before picking new work.

mod error;
mod state;

pub use error::DispatchError;
pub use state::{state_path, DispatchState, ProcessingEntry};

use crate::client::{Message, RemoteClient};
use crate::subprocess::{ProcessCommandBuilder, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const AGENT_ROLE: &str = "agent";
const ACTION_COMMAND_TYPE: &str = "action_command";
const HUMAN_ROLE: &str = "human";
const WORKER_RESULT_TYPE: &str = "worker_result";

/// Tunables, mirroring `message_dispatcher.py`'s module-level constants -
/// kept configurable so tests can shrink them to nothing.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub stuck_threshold: chrono::Duration,
    pub agent_timeout: Duration,
    pub max_turns: u32,
    /// Subdirectory (relative to the project root) the spawned agent is
    /// allowed to write inside; everything else is read-only.
    pub writable_subdir: PathBuf,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            stuck_threshold: chrono::Duration::seconds(300),
            agent_timeout: Duration::from_secs(180),
            max_turns: 5,
            writable_subdir: PathBuf::from(".octopoid/runtime/dispatch"),
        }
    }
}

pub struct MessageDispatcher {
    client: RemoteClient,
    runner: Arc<dyn ProcessRunner>,
    octopoid_dir: PathBuf,
    project_root: PathBuf,
    instructions: String,
    config: DispatcherConfig,
}

impl MessageDispatcher {
    pub fn new(
        client: RemoteClient,
        runner: Arc<dyn ProcessRunner>,
        octopoid_dir: PathBuf,
        project_root: PathBuf,
        instructions: String,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            client,
            runner,
            octopoid_dir,
            project_root,
            instructions,
            config,
        }
    }

    fn state_path(&self) -> PathBuf {
        state_path(&self.octopoid_dir)
    }

    /// Run exactly one iteration: sweep stuck work, then process at most
    /// one pending message. Called once per scheduler tick.
    pub async fn run_once(&self) -> Result<(), DispatchError> {
        let mut state = DispatchState::load(&self.state_path())?;

        for stuck_id in state.sweep_stuck(self.config.stuck_threshold) {
            warn!(message_id = %stuck_id, "action command stuck, forcing to failed");
            self.client
                .post_message(
                    HUMAN_ROLE,
                    WORKER_RESULT_TYPE,
                    &format!("Message {stuck_id} timed out waiting for a dispatcher tick and was force-failed."),
                )
                .await?;
        }
        state.save(&self.state_path())?;

        let pending = self.client.list_messages(AGENT_ROLE, ACTION_COMMAND_TYPE).await?;
        let Some(message) = pending.into_iter().find(|m| !state.is_handled(&m.id)) else {
            return Ok(());
        };

        state.mark_processing(&message.id, &message.content);
        state.save(&self.state_path())?;

        info!(message_id = %message.id, "dispatching action command");
        let outcome = self.execute(&message).await;

        match outcome {
            Ok(summary) => {
                state.mark_done(&message.id);
                state.save(&self.state_path())?;
                self.client
                    .post_message(HUMAN_ROLE, WORKER_RESULT_TYPE, &summary)
                    .await?;
            }
            Err(e) => {
                state.mark_failed(&message.id);
                state.save(&self.state_path())?;
                self.client
                    .post_message(
                        HUMAN_ROLE,
                        WORKER_RESULT_TYPE,
                        &format!("Message {} failed: {e}", message.id),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Build the constrained prompt and run a short-lived agent against it,
    /// enforcing the hard wall-clock timeout by killing the child if it's
    /// exceeded.
    async fn execute(&self, message: &Message) -> Result<String, DispatchError> {
        let prompt = self.build_prompt(message);
        let writable_abs = self.project_root.join(&self.config.writable_subdir);
        std::fs::create_dir_all(&writable_abs)?;

        let command = ProcessCommandBuilder::new("claude")
            .arg("-p")
            .arg(&prompt)
            .arg("--allowedTools")
            .arg("Read,Glob,Grep")
            .arg("--max-turns")
            .arg(&self.config.max_turns.to_string())
            .current_dir(&self.project_root)
            .timeout(self.config.agent_timeout)
            .build();

        let output = self.runner.run(command).await;

        match output {
            Ok(out) if out.status.success() => Ok(out.stdout),
            Ok(out) => Err(DispatchError::AgentFailed(out.stderr)),
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "dispatcher agent failed or timed out");
                Err(DispatchError::Process(e))
            }
        }
    }

    fn build_prompt(&self, message: &Message) -> String {
        format!(
            "{instructions}\n\n## Command\n\n{content}\n\n## Execution constraints\n\nYou may read anything in this repository. \
             You may write only inside `{writable}`. Do not run any git commands (no commit, push, branch, checkout, or \
             rebase) - this session has no authority to change repository state.\n",
            instructions = self.instructions,
            content = message.content,
            writable = self.config.writable_subdir.display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::SubprocessManager;

    fn dispatcher(client: RemoteClient, runner: Arc<dyn ProcessRunner>, root: &Path) -> MessageDispatcher {
        MessageDispatcher::new(
            client,
            runner,
            root.join(".octopoid"),
            root.to_path_buf(),
            "Follow project conventions.".to_string(),
            DispatcherConfig {
                stuck_threshold: chrono::Duration::seconds(300),
                agent_timeout: Duration::from_secs(5),
                max_turns: 3,
                writable_subdir: PathBuf::from(".octopoid/runtime/dispatch"),
            },
        )
    }

    #[test]
    fn prompt_forbids_git_and_names_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let (subprocess, _mock) = SubprocessManager::mock();
        let d = dispatcher(RemoteClient::new("http://x", "k"), subprocess.runner(), dir.path());
        let msg = Message {
            id: "1".to_string(),
            role: AGENT_ROLE.to_string(),
            message_type: ACTION_COMMAND_TYPE.to_string(),
            content: "summarize open PRs".to_string(),
        };
        let prompt = d.build_prompt(&msg);
        assert!(prompt.contains("Do not run any git commands"));
        assert!(prompt.contains(".octopoid/runtime/dispatch"));
        assert!(prompt.contains("summarize open PRs"));
    }
}
