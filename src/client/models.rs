//! Wire types for the remote task store, grounded on
//! `packages/python-sdk/octopoid_sdk/client.py`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStatus {
    pub name: String,
    pub point: String,
    #[serde(rename = "type")]
    pub hook_type: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub queue: String,
    pub role: String,
    pub priority: Priority,
    pub branch: String,
    #[serde(default = "default_flow_name")]
    pub flow: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub claimed_by: Option<String>,
    #[serde(default)]
    pub claimed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub pr_url: Option<String>,
    #[serde(default)]
    pub pr_number: Option<u64>,
    #[serde(default)]
    pub commits_count: Option<u32>,
    #[serde(default)]
    pub turns_used: Option<u32>,
    #[serde(default)]
    pub rejection_count: u32,
    #[serde(default)]
    pub needs_rebase: bool,
    #[serde(default)]
    pub hooks: Vec<HookStatus>,
    /// When set, a circuit-breaker trip splits the task into a planning
    /// task instead of just failing it outright (§ Result handler).
    #[serde(default)]
    pub escalate_on_circuit_break: bool,
}

fn default_flow_name() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_rebase: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimRequest {
    pub orchestrator_id: String,
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    pub commits_count: u32,
    pub turns_used: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptRequest {
    pub accepted_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectRequest {
    pub reason: String,
    pub rejected_by: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub action_type: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub shared_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDispatchRequest<'a> {
    pub role: &'a str,
    pub message_type: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: String,
    pub message_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowRegistration {
    pub name: String,
    pub states: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub action_type: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollResult {
    pub queue_counts: std::collections::HashMap<String, u32>,
}
