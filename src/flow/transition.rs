use super::{Condition, FlowError};
use serde::Deserialize;

/// One edge of the flow state machine.
///
/// On the wire this is a YAML mapping entry keyed by `"<from> -> <to>"`
/// (see [`TransitionBody::parse_key`]); in memory it's flattened into a
/// struct so the rest of the engine doesn't have to re-split the key.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from_state: String,
    pub to_state: String,
    /// Agent role that should claim tasks landing on `to_state` via this
    /// transition (only meaningful on the `incoming -> claimed` edge).
    pub agent: Option<String>,
    /// Step names executed, in order, when this transition fires.
    pub runs: Vec<String>,
    pub conditions: Vec<Condition>,
}

/// The YAML body paired with a transition's `"<from> -> <to>"` key.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransitionBody {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub runs: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Transition {
    /// Parse a `"<from> -> <to>"` key, the one place this arrow syntax is
    /// understood, grounded on `orchestrator/flow.py::Transition.from_dict`.
    pub fn parse_key(key: &str) -> Result<(String, String), FlowError> {
        let mut parts = key.split("->").map(str::trim);
        let from = parts.next().filter(|s| !s.is_empty());
        let to = parts.next().filter(|s| !s.is_empty());
        match (from, to, parts.next()) {
            (Some(from), Some(to), None) => Ok((from.to_string(), to.to_string())),
            _ => Err(FlowError::InvalidTransitionKey(key.to_string())),
        }
    }

    pub fn from_key_and_body(key: &str, body: TransitionBody) -> Result<Self, FlowError> {
        let (from_state, to_state) = Self::parse_key(key)?;
        Ok(Transition {
            from_state,
            to_state,
            agent: body.agent,
            runs: body.runs,
            conditions: body.conditions,
        })
    }

    pub(super) fn validate(&self) -> Result<(), FlowError> {
        if self.from_state.is_empty() || self.to_state.is_empty() {
            return Err(FlowError::InvalidTransitionKey(format!(
                "{} -> {}",
                self.from_state, self.to_state
            )));
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arrow_key() {
        assert_eq!(
            Transition::parse_key("incoming -> claimed").unwrap(),
            ("incoming".to_string(), "claimed".to_string())
        );
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(Transition::parse_key("incoming claimed").is_err());
        assert!(Transition::parse_key("a -> b -> c").is_err());
    }
}
