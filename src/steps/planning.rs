//! Planning escalation: when a task keeps tripping the circuit breaker and
//! is flagged `escalate_on_circuit_break`, split it into a planning task
//! instead of just failing it outright.
//!
//! Grounded on `orchestrator/planning.py`. Not part of the step registry
//! proper (it's invoked directly by the result handler's circuit breaker,
//! not listed under a transition's `runs`), but it reuses the same
//! `StepError` and client plumbing as the rest of the step library.

use super::StepError;
use crate::client::{RemoteClient, Task};
use regex::Regex;

/// One micro-task parsed out of a plan document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicroTask {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub dependencies: Vec<u32>,
}

/// Parse `### N. Title` sections with `**Description:**`,
/// `**Acceptance Criteria:**` (checkbox list), and `**Dependencies:**`
/// (comma-separated task numbers), mirroring
/// `planning.py::parse_plan_document`.
pub fn parse_plan_document(contents: &str) -> Vec<MicroTask> {
    let section_re = Regex::new(r"(?m)^###\s+(\d+)\.\s+(.+)$").expect("static regex is valid");
    let checkbox_re = Regex::new(r"(?m)^\s*-\s*\[[ xX]\]\s*(.+)$").expect("static regex is valid");

    let headers: Vec<(usize, u32, &str)> = section_re
        .captures_iter(contents)
        .map(|c| {
            let m = c.get(0).unwrap();
            let number: u32 = c[1].parse().unwrap_or(0);
            let title = c.get(2).unwrap().as_str().trim();
            (m.start(), number, title)
        })
        .collect();

    let mut tasks = Vec::new();
    for (i, &(start, number, title)) in headers.iter().enumerate() {
        let section_end = headers.get(i + 1).map(|h| h.0).unwrap_or(contents.len());
        let body = &contents[start..section_end];

        let description = extract_labeled_block(body, "Description");
        let acceptance_block = extract_labeled_block(body, "Acceptance Criteria");
        let acceptance_criteria = checkbox_re
            .captures_iter(&acceptance_block)
            .map(|c| c[1].trim().to_string())
            .collect();

        let dependencies = extract_labeled_block(body, "Dependencies")
            .split(',')
            .filter_map(|s| s.trim().trim_start_matches('#').parse::<u32>().ok())
            .collect();

        tasks.push(MicroTask {
            number,
            title: title.to_string(),
            description,
            acceptance_criteria,
            dependencies,
        });
    }
    tasks
}

fn extract_labeled_block(section: &str, label: &str) -> String {
    let marker = format!("**{label}:**");
    let Some(start) = section.find(&marker) else {
        return String::new();
    };
    let after = &section[start + marker.len()..];
    let end = after.find("\n**").unwrap_or(after.len());
    after[..end].trim().to_string()
}

/// Create a new planning task in `incoming`, referencing the original via
/// `original_task`, and return its id.
pub async fn escalate_to_planning(
    client: &RemoteClient,
    original: &Task,
    failure_notes: &str,
) -> Result<Task, StepError> {
    let planning_task = Task {
        id: String::new(),
        queue: "incoming".to_string(),
        role: "planner".to_string(),
        priority: original.priority,
        branch: original.branch.clone(),
        flow: "default".to_string(),
        project_id: original.project_id.clone(),
        blocked_by: vec![],
        claimed_by: None,
        claimed_at: None,
        pr_url: None,
        pr_number: None,
        commits_count: None,
        turns_used: None,
        rejection_count: 0,
        needs_rebase: false,
        hooks: vec![],
        escalate_on_circuit_break: false,
    };

    client
        .create_action(&crate::client::ActionRequest {
            entity_type: "task".to_string(),
            entity_id: original.id.clone(),
            action_type: "escalated_to_planning".to_string(),
            label: "Escalated to planning".to_string(),
            description: Some(failure_notes.to_string()),
            action_data: None,
        })
        .await?;

    let created = client.create_task(&planning_task).await?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_micro_tasks_with_dependencies() {
        let doc = "\
### 1. Add schema migration
**Description:** Add the new column.
**Acceptance Criteria:**
- [ ] Migration runs cleanly
- [ ] Rollback works
**Dependencies:** none

### 2. Wire up the API
**Description:** Expose the new field.
**Acceptance Criteria:**
- [ ] Field returned in GET
**Dependencies:** #1
";
        let tasks = parse_plan_document(doc);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].number, 1);
        assert_eq!(tasks[0].acceptance_criteria.len(), 2);
        assert_eq!(tasks[1].dependencies, vec![1]);
    }

    #[test]
    fn empty_document_yields_no_tasks() {
        assert!(parse_plan_document("no sections here").is_empty());
    }
}
