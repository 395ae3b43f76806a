//! Reads an agent's output, consults the flow, executes steps, classifies
//! outcomes, and applies state transitions with circuit-breaker protection.
//!
//! Grounded on `orchestrator/result_handler.py`. Two dispatch paths exist:
//! [`ResultHandler::handle_agent_result`] for implementer agents (outcome-
//! keyed) and [`ResultHandler::handle_agent_result_via_flow`] for
//! gatekeeper/review agents (status/decision-keyed, with a stale-result
//! guard since the server's queue may have moved since the agent claimed
//! it).

mod error;
mod types;

pub use error::{Disposition, ResultHandlerError};
pub use types::{AgentResult, GatekeeperDecision, GatekeeperStatus, ImplementerOutcome};

use crate::client::{AcceptRequest, ClaimRequest, RemoteClient, SubmitRequest, Task, TaskUpdate};
use crate::config::AgentsConfig;
use crate::flow::{self, ConditionType, Flow};
use crate::repo::RepoManager;
use crate::steps::{self, StepContext};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STEP_FAILURE_COUNT_FILE: &str = "step_failure_count";

pub struct ResultHandler {
    pub client: RemoteClient,
    pub flows_dir: PathBuf,
}

impl ResultHandler {
    pub fn new(client: RemoteClient, flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            flows_dir: flows_dir.into(),
        }
    }

    /// Read `result.json` out of `task_dir`, inferring a synthetic result
    /// when the file is absent (see [`AgentResult::infer_missing`]) and
    /// tolerating malformed JSON by classifying it as a failure rather than
    /// propagating the parse error.
    pub fn read_result(&self, task_dir: &Path) -> AgentResult {
        let result_path = task_dir.join("result.json");
        match std::fs::read_to_string(&result_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(result) => result,
                Err(e) => AgentResult::malformed(&e),
            },
            Err(_) => {
                let notes_nonempty = std::fs::read_to_string(task_dir.join("notes.md"))
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false);
                AgentResult::infer_missing(notes_nonempty)
            }
        }
    }

    fn step_failure_count_path(task_dir: &Path) -> PathBuf {
        task_dir.join(STEP_FAILURE_COUNT_FILE)
    }

    fn read_step_failure_count(task_dir: &Path) -> u32 {
        std::fs::read_to_string(Self::step_failure_count_path(task_dir))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    fn increment_step_failure_count(task_dir: &Path) -> std::io::Result<u32> {
        let count = Self::read_step_failure_count(task_dir) + 1;
        std::fs::write(Self::step_failure_count_path(task_dir), count.to_string())?;
        Ok(count)
    }

    fn reset_step_failure_count(task_dir: &Path) {
        let _ = std::fs::remove_file(Self::step_failure_count_path(task_dir));
    }

    fn load_flow_for(&self, task: &Task) -> Result<Flow, ResultHandlerError> {
        Ok(flow::load_flow(&self.flows_dir, &task.flow)?)
    }

    /// Implementer outcome dispatch. Mirrors
    /// `result_handler.py::handle_agent_result`.
    pub async fn handle_agent_result(
        &self,
        repo: RepoManager,
        task_dir: &Path,
        agents: &AgentsConfig,
    ) -> Result<Disposition, ResultHandlerError> {
        let Some(task) = self.client.get_task(&task_id_from_dir(task_dir)).await? else {
            return Ok(Disposition::Resolved);
        };

        if task.queue != "claimed" {
            return Ok(Disposition::Resolved);
        }

        let result = self.read_result(task_dir);
        let outcome = result.outcome.unwrap_or(ImplementerOutcome::Error);

        let attempt = self
            .dispatch_implementer_outcome(repo, task.clone(), result, outcome, task_dir)
            .await;

        match attempt {
            Ok(()) => {
                Self::reset_step_failure_count(task_dir);
                Ok(Disposition::Resolved)
            }
            Err(e) => {
                let count = Self::increment_step_failure_count(task_dir)?;
                if count < agents.circuit_breaker_threshold {
                    warn!(task_id = %task.id, attempt = count, error = %e, "step failed, retrying next tick");
                    Ok(Disposition::RetryNextTick)
                } else {
                    Self::reset_step_failure_count(task_dir);
                    let notes = format!("circuit breaker tripped after {count} attempts: {e}");

                    if task.escalate_on_circuit_break {
                        match steps::escalate_to_planning(&self.client, &task, &notes).await {
                            Ok(planning_task) => {
                                info!(task_id = %task.id, planning_task_id = %planning_task.id, "escalated to planning after circuit breaker trip");
                            }
                            Err(escalate_err) => {
                                warn!(task_id = %task.id, error = %escalate_err, "escalation to planning failed, failing task directly");
                            }
                        }
                    }

                    self.client
                        .update_task(
                            &task.id,
                            &TaskUpdate {
                                queue: Some("failed".to_string()),
                                execution_notes: Some(notes),
                                ..Default::default()
                            },
                        )
                        .await?;
                    Ok(Disposition::Resolved)
                }
            }
        }
    }

    async fn dispatch_implementer_outcome(
        &self,
        repo: RepoManager,
        task: Task,
        result: AgentResult,
        outcome: ImplementerOutcome,
        task_dir: &Path,
    ) -> Result<(), ResultHandlerError> {
        match outcome {
            ImplementerOutcome::Done | ImplementerOutcome::Submitted => {
                self.handle_done_outcome(repo, task, result, task_dir).await
            }
            ImplementerOutcome::Failed | ImplementerOutcome::Error => {
                self.handle_fail_outcome(task, result).await
            }
            ImplementerOutcome::NeedsContinuation => self.handle_continuation_outcome(task).await,
        }
    }

    async fn handle_done_outcome(
        &self,
        repo: RepoManager,
        task: Task,
        result: AgentResult,
        task_dir: &Path,
    ) -> Result<(), ResultHandlerError> {
        let flow = self.load_flow_for(&task)?;
        let flow = if task.project_id.is_some() {
            flow.child_flow.map(|b| *b).unwrap_or(flow)
        } else {
            flow
        };

        let transitions = flow.transitions_from("claimed");
        let Some(transition) = transitions.first() else {
            // No transition defined for this flow; fall back to a direct submit.
            self.client
                .submit_task(
                    &task.id,
                    &SubmitRequest {
                        pr_url: task.pr_url.clone(),
                        commits_count: task.commits_count.unwrap_or(0),
                        turns_used: task.turns_used.unwrap_or(0),
                    },
                )
                .await?;
            return Ok(());
        };

        let mut ctx = StepContext {
            repo,
            client: self.client.clone(),
            task: task.clone(),
            result,
            task_dir: task_dir.to_path_buf(),
        };
        steps::execute_steps(&transition.runs, &mut ctx).await?;

        match transition.to_state.as_str() {
            "provisional" => {
                self.client
                    .submit_task(
                        &ctx.task.id,
                        &SubmitRequest {
                            pr_url: ctx.task.pr_url.clone(),
                            commits_count: ctx.task.commits_count.unwrap_or(0),
                            turns_used: ctx.task.turns_used.unwrap_or(0),
                        },
                    )
                    .await?;
            }
            "done" => {
                self.client
                    .accept_task(
                        &ctx.task.id,
                        &AcceptRequest {
                            accepted_by: "orchestrator".to_string(),
                        },
                    )
                    .await?;
            }
            other => {
                self.client
                    .update_task(
                        &ctx.task.id,
                        &TaskUpdate {
                            queue: Some(other.to_string()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn handle_fail_outcome(
        &self,
        task: Task,
        result: AgentResult,
    ) -> Result<(), ResultHandlerError> {
        let target = self
            .load_flow_for(&task)
            .ok()
            .and_then(|flow| {
                flow.transitions_from("claimed")
                    .into_iter()
                    .find_map(|t| t.conditions.first().and_then(|c| c.on_fail.clone()))
            })
            .unwrap_or_else(|| "failed".to_string());

        self.client
            .update_task(
                &task.id,
                &TaskUpdate {
                    queue: Some(target),
                    execution_notes: result.reason.or(result.message),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn handle_continuation_outcome(&self, task: Task) -> Result<(), ResultHandlerError> {
        // Open Question preserved verbatim: no flow defines outbound
        // transitions from `needs_continuation`; the engine always routes
        // there and stops.
        self.client
            .update_task(
                &task.id,
                &TaskUpdate {
                    queue: Some("needs_continuation".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Gatekeeper/review outcome dispatch, used when a review agent claimed
    /// the task against an `expected_queue` rather than `claimed`. Mirrors
    /// `result_handler.py::handle_agent_result_via_flow`.
    pub async fn handle_agent_result_via_flow(
        &self,
        repo: RepoManager,
        task_dir: &Path,
        expected_queue: &str,
    ) -> Result<Disposition, ResultHandlerError> {
        let task_id = task_id_from_dir(task_dir);
        let outcome = self
            .try_handle_via_flow(repo, task_dir, expected_queue, &task_id)
            .await;

        match outcome {
            Ok(disposition) => Ok(disposition),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "gatekeeper dispatch crashed, forcing task to failed");
                self.client
                    .update_task(
                        &task_id,
                        &TaskUpdate {
                            queue: Some("failed".to_string()),
                            execution_notes: Some(format!("gatekeeper dispatch crashed: {e}")),
                            ..Default::default()
                        },
                    )
                    .await?;
                Ok(Disposition::Resolved)
            }
        }
    }

    async fn try_handle_via_flow(
        &self,
        repo: RepoManager,
        task_dir: &Path,
        expected_queue: &str,
        task_id: &str,
    ) -> Result<Disposition, ResultHandlerError> {
        let Some(task) = self.client.get_task(task_id).await? else {
            return Ok(Disposition::Resolved);
        };

        if task.queue != expected_queue && task.queue != "claimed" {
            info!(task_id = %task.id, current = %task.queue, expected = %expected_queue, "stale result, discarding");
            return Ok(Disposition::Resolved);
        }

        let result = self.read_result(task_dir);

        if result.status == Some(GatekeeperStatus::Failure) {
            let flow = self.load_flow_for(&task)?;
            let target = flow
                .transitions_from(expected_queue)
                .into_iter()
                .find_map(|t| {
                    t.conditions
                        .iter()
                        .find(|c| c.condition_type == ConditionType::Agent)
                        .and_then(|c| c.on_fail.clone())
                })
                .unwrap_or_else(|| "rejected".to_string());

            self.client
                .update_task(
                    &task.id,
                    &TaskUpdate {
                        queue: Some(target),
                        execution_notes: result.message.clone(),
                        ..Default::default()
                    },
                )
                .await?;
            return Ok(Disposition::Resolved);
        }

        match result.decision {
            Some(GatekeeperDecision::Reject) => {
                let mut ctx = StepContext {
                    repo,
                    client: self.client.clone(),
                    task: task.clone(),
                    result,
                    task_dir: task_dir.to_path_buf(),
                };
                steps::execute_steps(&["reject_with_feedback".to_string()], &mut ctx).await?;
                Ok(Disposition::Resolved)
            }
            Some(GatekeeperDecision::Approve) => {
                let flow = self.load_flow_for(&task)?;
                let transition = flow.transitions_from(expected_queue).into_iter().next();
                if let Some(transition) = transition {
                    let mut ctx = StepContext {
                        repo,
                        client: self.client.clone(),
                        task: task.clone(),
                        result,
                        task_dir: task_dir.to_path_buf(),
                    };
                    steps::execute_steps(&transition.runs, &mut ctx).await?;
                }
                Ok(Disposition::Resolved)
            }
            None => {
                info!(task_id = %task.id, "gatekeeper left no decision, awaiting human review");
                Ok(Disposition::RetryNextTick)
            }
        }
    }

    pub async fn claim_next(
        &self,
        orchestrator_id: &str,
        agent_name: &str,
        role_filter: Option<&str>,
    ) -> Result<Option<Task>, ResultHandlerError> {
        Ok(self
            .client
            .claim_task(&ClaimRequest {
                orchestrator_id: orchestrator_id.to_string(),
                agent_name: agent_name.to_string(),
                role_filter: role_filter.map(str::to_string),
                type_filter: None,
            })
            .await?)
    }
}

fn task_id_from_dir(task_dir: &Path) -> String {
    task_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .trim_start_matches("TASK-")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_result_with_notes_infers_continuation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "ran out of turns, see branch").unwrap();
        let handler = ResultHandler::new(
            RemoteClient::new("http://localhost", "key"),
            dir.path().join("flows"),
        );
        let result = handler.read_result(dir.path());
        assert_eq!(result.outcome, Some(ImplementerOutcome::NeedsContinuation));
    }

    #[test]
    fn missing_result_without_notes_infers_error() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ResultHandler::new(
            RemoteClient::new("http://localhost", "key"),
            dir.path().join("flows"),
        );
        let result = handler.read_result(dir.path());
        assert_eq!(result.outcome, Some(ImplementerOutcome::Error));
    }

    #[test]
    fn malformed_json_is_classified_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("result.json"), "{not json").unwrap();
        let handler = ResultHandler::new(
            RemoteClient::new("http://localhost", "key"),
            dir.path().join("flows"),
        );
        let result = handler.read_result(dir.path());
        assert_eq!(result.status, Some(GatekeeperStatus::Failure));
    }

    #[test]
    fn step_failure_count_increments_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ResultHandler::read_step_failure_count(dir.path()), 0);
        assert_eq!(ResultHandler::increment_step_failure_count(dir.path()).unwrap(), 1);
        assert_eq!(ResultHandler::increment_step_failure_count(dir.path()).unwrap(), 2);
        ResultHandler::reset_step_failure_count(dir.path());
        assert_eq!(ResultHandler::read_step_failure_count(dir.path()), 0);
    }
}
