//! Shapes read back from an agent's `result.json`.
//!
//! Grounded on `orchestrator/result_handler.py::read_result_json` and the
//! two distinct producers of a result file: an implementer agent (`outcome`)
//! and a gatekeeper/review agent (`status`/`decision`).

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplementerOutcome {
    Done,
    Submitted,
    Failed,
    Error,
    NeedsContinuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatekeeperStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatekeeperDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentResult {
    #[serde(default)]
    pub outcome: Option<ImplementerOutcome>,
    #[serde(default)]
    pub status: Option<GatekeeperStatus>,
    #[serde(default)]
    pub decision: Option<GatekeeperDecision>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AgentResult {
    /// Synthesize a result when `result.json` is missing.
    ///
    /// Matches `_read_or_infer_result`: a non-empty `notes.md` implies the
    /// agent ran out of turns mid-task rather than crashing outright, so it
    /// gets routed to continuation instead of being treated as a hard
    /// failure.
    pub fn infer_missing(notes_nonempty: bool) -> Self {
        if notes_nonempty {
            AgentResult {
                outcome: Some(ImplementerOutcome::NeedsContinuation),
                status: None,
                decision: None,
                reason: Some("result.json missing, continuation notes present".to_string()),
                comment: None,
                message: None,
            }
        } else {
            AgentResult {
                outcome: Some(ImplementerOutcome::Error),
                status: Some(GatekeeperStatus::Failure),
                decision: None,
                reason: Some("result.json missing and no continuation notes".to_string()),
                comment: None,
                message: None,
            }
        }
    }

    pub fn malformed(parse_error: &serde_json::Error) -> Self {
        AgentResult {
            outcome: Some(ImplementerOutcome::Error),
            status: Some(GatekeeperStatus::Failure),
            decision: None,
            reason: Some(format!("result.json malformed: {parse_error}")),
            comment: None,
            message: None,
        }
    }
}
