use serde::Deserialize;

/// How a transition's gating condition is evaluated.
///
/// Grounded on `orchestrator/flow.py::Condition`: a condition is either
/// a script the step registry runs (`Script`), an agent consulted for a
/// judgment call (`Agent`), or a manual gate that only a human can clear
/// (`Manual`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Script,
    Agent,
    Manual,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    /// State to transition to if this condition fails, overriding the
    /// transition's own failure handling.
    #[serde(default)]
    pub on_fail: Option<String>,
    /// When true, this condition is skipped entirely (used to stage a flow
    /// change without yet enforcing it).
    #[serde(default)]
    pub skip: bool,
}

impl Condition {
    pub(super) fn validate(&self) -> Result<(), super::FlowError> {
        if self.name.trim().is_empty() {
            return Err(super::FlowError::InvalidCondition(
                "condition name must not be empty".to_string(),
            ));
        }
        match self.condition_type {
            ConditionType::Script if self.script.is_none() => Err(
                super::FlowError::InvalidCondition(format!(
                    "condition '{}' has type script but no script name",
                    self.name
                )),
            ),
            ConditionType::Agent if self.agent.is_none() => Err(super::FlowError::InvalidCondition(
                format!("condition '{}' has type agent but no agent name", self.name),
            )),
            _ => Ok(()),
        }
    }
}
