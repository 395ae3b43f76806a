//! Declarative flow engine: states, transitions, and the conditions gating
//! them.
//!
//! A [`Flow`] is a YAML-defined state machine that drives a task from
//! `incoming` through to one of its terminal states (`done`, `failed`,
//! `rejected`). The scheduler and result handler never hardcode a task's
//! next queue; they always ask the flow for the transition out of the
//! task's current state.

mod condition;
mod error;
mod transition;

pub use condition::{Condition, ConditionType};
pub use error::FlowError;
pub use transition::{Transition, TransitionBody};

use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// The always-present entry state every flow starts new tasks in.
pub const INCOMING_STATE: &str = "incoming";

/// States exempt from the reachability check: a flow is allowed to have no
/// path back out of `rejected`, and `done`/`failed` are terminal by
/// definition.
const REACHABILITY_EXEMPT: &[&str] = &["done", "failed", "rejected"];

#[derive(Debug, Clone)]
pub struct Flow {
    pub name: String,
    pub description: String,
    pub transitions: Vec<Transition>,
    /// Nested flow used for child tasks spawned off a project task
    /// (mirrors the Python orchestrator's `child_flow` field).
    pub child_flow: Option<Box<Flow>>,
}

/// Wire shape: `transitions` is a YAML mapping keyed by `"<from> -> <to>"`,
/// not a sequence, so it can't derive `Deserialize` directly onto [`Flow`].
#[derive(Debug, Deserialize)]
struct RawFlow {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    transitions: HashMap<String, TransitionBody>,
    #[serde(default)]
    child_flow: Option<Box<RawFlow>>,
}

impl RawFlow {
    fn into_flow(self, fallback_name: &str) -> Result<Flow, FlowError> {
        let mut transitions = self
            .transitions
            .into_iter()
            .map(|(key, body)| Transition::from_key_and_body(&key, body))
            .collect::<Result<Vec<_>, _>>()?;
        transitions.sort_by(|a, b| (&a.from_state, &a.to_state).cmp(&(&b.from_state, &b.to_state)));

        let name = if self.name.is_empty() {
            fallback_name.to_string()
        } else {
            self.name
        };
        let child_flow = self
            .child_flow
            .map(|raw| raw.into_flow(&format!("{name}/child")))
            .transpose()?
            .map(Box::new);

        Ok(Flow {
            name,
            description: self.description,
            transitions,
            child_flow,
        })
    }
}

impl Flow {
    /// Parse a flow from its YAML file on disk.
    pub fn from_yaml_file(path: &Path) -> Result<Self, FlowError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| FlowError::Io(path.to_path_buf(), e))?;
        let raw: RawFlow = serde_yaml::from_str(&contents)
            .map_err(|e| FlowError::Parse(path.to_path_buf(), e))?;
        let fallback_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("flow")
            .to_string();
        raw.into_flow(&fallback_name)
    }

    /// All states participating in this flow: the union of every
    /// transition's `from_state` and `to_state`.
    pub fn all_states(&self) -> HashSet<&str> {
        let mut states = HashSet::new();
        for t in &self.transitions {
            states.insert(t.from_state.as_str());
            states.insert(t.to_state.as_str());
        }
        states
    }

    /// Transitions whose `from_state` matches `state`, in declaration order.
    pub fn transitions_from(&self, state: &str) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.from_state == state)
            .collect()
    }

    /// Validate structural integrity: every transition's conditions parse,
    /// and every state is reachable from [`INCOMING_STATE`] by BFS, except
    /// the terminal states listed in [`REACHABILITY_EXEMPT`].
    ///
    /// Non-fatal: returns the list of violations found rather than failing
    /// on the first one, mirroring `orchestrator/flow.py::Flow.validate()`.
    /// A flow (such as the built-in `project` flow, whose top level has no
    /// `incoming` state of its own - that lives in its `child_flow`) can be
    /// loaded and used even when this reports unreachable states.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.transitions.is_empty() {
            errors.push(FlowError::Empty(self.name.clone()).to_string());
            return errors;
        }

        for t in &self.transitions {
            if let Err(e) = t.validate() {
                errors.push(e.to_string());
            }
        }

        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for t in &self.transitions {
            adjacency
                .entry(t.from_state.as_str())
                .or_default()
                .push(t.to_state.as_str());
        }

        let all_states = self.all_states();
        let mut reached: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::new();
        if all_states.contains(INCOMING_STATE) {
            queue.push_back(INCOMING_STATE);
            reached.insert(INCOMING_STATE);
        }

        while let Some(state) = queue.pop_front() {
            for &next in adjacency.get(state).into_iter().flatten() {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        let mut unreachable: Vec<&str> = all_states
            .iter()
            .copied()
            .filter(|state| !REACHABILITY_EXEMPT.contains(state) && !reached.contains(state))
            .collect();
        unreachable.sort_unstable();
        for state in unreachable {
            errors.push(
                FlowError::Unreachable {
                    flow: self.name.clone(),
                    state: state.to_string(),
                }
                .to_string(),
            );
        }

        if let Some(child) = &self.child_flow {
            errors.extend(child.validate());
        }

        errors
    }

    /// Render this flow back to the `"<from> -> <to>"`-keyed YAML shape,
    /// used by `octopoid init` to write out the bootstrap flow files.
    pub fn to_yaml_string(&self) -> Result<String, FlowError> {
        let mut root = serde_yaml::Mapping::new();
        root.insert("name".into(), self.name.clone().into());
        root.insert("description".into(), self.description.clone().into());
        root.insert("transitions".into(), self.transitions_as_mapping());
        if let Some(child) = &self.child_flow {
            let mut child_root = serde_yaml::Mapping::new();
            child_root.insert("description".into(), child.description.clone().into());
            child_root.insert("transitions".into(), child.transitions_as_mapping());
            root.insert("child_flow".into(), serde_yaml::Value::Mapping(child_root));
        }
        serde_yaml::to_string(&serde_yaml::Value::Mapping(root))
            .map_err(|e| FlowError::Parse(PathBuf::from(&self.name), e))
    }

    fn transitions_as_mapping(&self) -> serde_yaml::Value {
        let mut transitions = serde_yaml::Mapping::new();
        for t in &self.transitions {
            let mut body = serde_yaml::Mapping::new();
            if let Some(agent) = &t.agent {
                body.insert("agent".into(), agent.clone().into());
            }
            if !t.runs.is_empty() {
                body.insert(
                    "runs".into(),
                    serde_yaml::Value::Sequence(t.runs.iter().cloned().map(Into::into).collect()),
                );
            }
            if !t.conditions.is_empty() {
                let conditions = t
                    .conditions
                    .iter()
                    .map(|c| {
                        let mut m = serde_yaml::Mapping::new();
                        m.insert("name".into(), c.name.clone().into());
                        let type_str = match c.condition_type {
                            ConditionType::Script => "script",
                            ConditionType::Agent => "agent",
                            ConditionType::Manual => "manual",
                        };
                        m.insert("type".into(), type_str.into());
                        if let Some(script) = &c.script {
                            m.insert("script".into(), script.clone().into());
                        }
                        if let Some(agent) = &c.agent {
                            m.insert("agent".into(), agent.clone().into());
                        }
                        serde_yaml::Value::Mapping(m)
                    })
                    .collect();
                body.insert("conditions".into(), serde_yaml::Value::Sequence(conditions));
            }
            transitions.insert(
                format!("{} -> {}", t.from_state, t.to_state).into(),
                serde_yaml::Value::Mapping(body),
            );
        }
        serde_yaml::Value::Mapping(transitions)
    }
}

/// List the flow names available under `flows_dir` (files named `*.yaml`).
pub fn list_flows(flows_dir: &Path) -> Result<Vec<String>, FlowError> {
    let mut names = Vec::new();
    if !flows_dir.exists() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(flows_dir).map_err(|e| FlowError::Io(flows_dir.to_path_buf(), e))? {
        let entry = entry.map_err(|e| FlowError::Io(flows_dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Load the named flow from `flows_dir/{name}.yaml`.
pub fn load_flow(flows_dir: &Path, name: &str) -> Result<Flow, FlowError> {
    let path = flows_dir.join(format!("{name}.yaml"));
    if !path.exists() {
        return Err(FlowError::NotFound(name.to_string()));
    }
    Flow::from_yaml_file(&path)
}

pub fn default_flow_name() -> &'static str {
    "default"
}

/// The built-in default flow, written out by `octopoid init`.
///
/// Grounded on `orchestrator/flow.py::generate_default_flow`: claim, run
/// tests and rebase, open a PR, wait for human approval, merge.
pub fn generate_default_flow() -> Flow {
    Flow {
        name: "default".to_string(),
        description: "Default single-task flow: claim, validate, PR, human approval, merge"
            .to_string(),
        transitions: vec![
            Transition {
                from_state: "incoming".to_string(),
                to_state: "claimed".to_string(),
                agent: Some("implementer".to_string()),
                runs: vec![],
                conditions: vec![],
            },
            Transition {
                from_state: "claimed".to_string(),
                to_state: "provisional".to_string(),
                agent: None,
                runs: vec![
                    "rebase_on_main".to_string(),
                    "run_tests".to_string(),
                    "create_pr".to_string(),
                ],
                conditions: vec![],
            },
            Transition {
                from_state: "provisional".to_string(),
                to_state: "done".to_string(),
                agent: None,
                runs: vec!["merge_pr".to_string()],
                conditions: vec![Condition {
                    name: "human_approval".to_string(),
                    condition_type: ConditionType::Manual,
                    script: None,
                    agent: None,
                    on_fail: None,
                    skip: false,
                }],
            },
        ],
        child_flow: None,
    }
}

/// The flow used for project tasks, grounded on
/// `orchestrator/flow.py::generate_project_flow`.
///
/// The top level only gates the project task itself, from
/// `children_complete` (set once every spawned child task reaches `done`)
/// through `provisional` to `done`. The `incoming -> claimed` and
/// `claimed -> done` transitions a child task actually runs through live
/// under `child_flow`, not at the top level - they describe the children,
/// not the project task.
pub fn generate_project_flow() -> Flow {
    Flow {
        name: "project".to_string(),
        description: "Project task flow: children run to completion on a project branch, then \
                      the project itself opens a single PR once all children pass"
            .to_string(),
        transitions: vec![
            Transition {
                from_state: "children_complete".to_string(),
                to_state: "provisional".to_string(),
                agent: None,
                runs: vec!["create_pr".to_string()],
                conditions: vec![Condition {
                    name: "all_tests_pass".to_string(),
                    condition_type: ConditionType::Script,
                    script: Some("all_tests_pass".to_string()),
                    agent: None,
                    on_fail: None,
                    skip: false,
                }],
            },
            Transition {
                from_state: "provisional".to_string(),
                to_state: "done".to_string(),
                agent: None,
                runs: vec!["merge_pr".to_string()],
                conditions: vec![Condition {
                    name: "human_approval".to_string(),
                    condition_type: ConditionType::Manual,
                    script: None,
                    agent: None,
                    on_fail: None,
                    skip: false,
                }],
            },
        ],
        child_flow: Some(Box::new(Flow {
            name: "project/child".to_string(),
            description: "Child task flow: claim onto the project branch, validate, done"
                .to_string(),
            transitions: vec![
                Transition {
                    from_state: "incoming".to_string(),
                    to_state: "claimed".to_string(),
                    agent: Some("implementer".to_string()),
                    runs: vec![],
                    conditions: vec![],
                },
                Transition {
                    from_state: "claimed".to_string(),
                    to_state: "done".to_string(),
                    agent: None,
                    runs: vec![
                        "rebase_on_project_branch".to_string(),
                        "run_tests".to_string(),
                    ],
                    conditions: vec![],
                },
            ],
            child_flow: None,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flow_validates() {
        assert!(generate_default_flow().validate().is_empty());
    }

    /// The project flow's top level has no `incoming` state of its own (it
    /// lives in `child_flow`), so `children_complete`/`provisional` come up
    /// unreachable from a top-level BFS. That's expected and non-fatal -
    /// `generate_project_flow` is still used as-is, matching what the
    /// original Python `Flow.validate()` reports for the same flow.
    #[test]
    fn project_flow_reports_expected_unreachable_states_but_still_loads() {
        let errors = generate_project_flow().validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("children_complete")));
        assert!(errors.iter().any(|e| e.contains("provisional")));
    }

    #[test]
    fn project_flow_child_flow_nests_the_claim_transitions() {
        let flow = generate_project_flow();
        assert!(flow.transitions_from("incoming").is_empty());
        let child = flow.child_flow.expect("project flow has a child flow");
        assert!(child.validate().is_empty());
        assert_eq!(child.transitions_from("incoming").len(), 1);
        assert_eq!(child.transitions_from("incoming")[0].to_state, "claimed");
    }

    #[test]
    fn unreachable_state_is_rejected() {
        let flow = Flow {
            name: "broken".to_string(),
            description: String::new(),
            transitions: vec![
                Transition {
                    from_state: "incoming".to_string(),
                    to_state: "claimed".to_string(),
                    agent: None,
                    runs: vec![],
                    conditions: vec![],
                },
                Transition {
                    from_state: "orphaned".to_string(),
                    to_state: "done".to_string(),
                    agent: None,
                    runs: vec![],
                    conditions: vec![],
                },
            ],
            child_flow: None,
        };
        let errors = flow.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("orphaned"));
    }

    #[test]
    fn all_states_collects_both_sides_of_every_transition() {
        let flow = generate_default_flow();
        let states = flow.all_states();
        assert!(states.contains("incoming"));
        assert!(states.contains("claimed"));
        assert!(states.contains("provisional"));
        assert!(states.contains("done"));
    }

    #[test]
    fn transitions_from_filters_by_source_state() {
        let flow = generate_default_flow();
        let from_claimed = flow.transitions_from("claimed");
        assert_eq!(from_claimed.len(), 1);
        assert_eq!(from_claimed[0].to_state, "provisional");
    }
}
