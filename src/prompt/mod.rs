//! Prompt rendering: fills `.octopoid/prompts/<role>.md` with task fields,
//! a required-steps block, previous-rejection feedback, and continuation
//! notes.
//!
//! Grounded in `orchestrator/prompt_renderer.py`, ported from Python's
//! `string.Template.safe_substitute` (missing variables left as-is) onto
//! `tera::Tera::one_off`, which is given the same permissiveness by
//! registering every expected variable up front, even when empty - an
//! unset `{{ continuation_section }}` renders as nothing rather than
//! erroring.

use crate::client::Task;
use crate::task_thread::ThreadEntry;
use tera::{Context, Tera};

/// Step names that get a human-readable blurb in the "Required Steps
/// Before Finishing" block, mirroring the special cases in
/// `prompt_renderer.py::render_prompt`.
fn describe_required_step(name: &str) -> String {
    match name {
        "run_tests" => "Run the test suite and ensure it passes before finishing.".to_string(),
        "create_pr" => "Open a pull request once your change is committed and pushed.".to_string(),
        "rebase_on_main" => "Rebase your branch onto main before opening a pull request.".to_string(),
        other => format!("Run `{other}` as part of finishing this task."),
    }
}

fn required_steps_block(agent_hooks: &[String]) -> String {
    if agent_hooks.is_empty() {
        return String::new();
    }
    let mut block = String::from("## Required Steps Before Finishing\n\n");
    for hook in agent_hooks {
        block.push_str(&format!("- {}\n", describe_required_step(hook)));
    }
    block
}

pub fn render_prompt(
    role: &str,
    task: &Task,
    template_text: &str,
    global_instructions: &str,
    rejection_history: &[ThreadEntry],
    continuation_notes: Option<&str>,
    scripts_dir: &str,
    agent_hooks: &[String],
) -> Result<String, tera::Error> {
    let review_section = crate::task_thread::format_thread_for_prompt(rejection_history);
    let continuation_section = continuation_notes
        .map(|notes| format!("## Continuation Notes\n\n{notes}\n"))
        .unwrap_or_default();

    let mut ctx = Context::new();
    ctx.insert("role", role);
    ctx.insert("task_id", &task.id);
    ctx.insert("task_title", &task.role);
    ctx.insert("task_content", "");
    ctx.insert(
        "task_priority",
        &format!("{:?}", task.priority).to_uppercase(),
    );
    ctx.insert("task_branch", &task.branch);
    ctx.insert("task_type", &task.role);
    ctx.insert("scripts_dir", scripts_dir);
    ctx.insert("global_instructions", global_instructions);
    ctx.insert("required_steps", &required_steps_block(agent_hooks));
    ctx.insert("review_section", &review_section);
    ctx.insert("continuation_section", &continuation_section);

    Tera::one_off(template_text, &ctx, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Priority;

    fn sample_task() -> Task {
        Task {
            id: "42".to_string(),
            queue: "claimed".to_string(),
            role: "implementer".to_string(),
            priority: Priority::P1,
            branch: "agent/42".to_string(),
            flow: "default".to_string(),
            project_id: None,
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
        }
    }

    #[test]
    fn unset_sections_render_as_empty_not_as_errors() {
        let template = "Task {{ task_id }}\n{{ continuation_section }}{{ review_section }}";
        let rendered = render_prompt(
            "implementer",
            &sample_task(),
            template,
            "",
            &[],
            None,
            "scripts/",
            &[],
        )
        .unwrap();
        assert_eq!(rendered, "Task 42\n");
    }

    #[test]
    fn required_steps_lists_known_hooks_with_descriptions() {
        let template = "{{ required_steps }}";
        let rendered = render_prompt(
            "implementer",
            &sample_task(),
            template,
            "",
            &[],
            None,
            "scripts/",
            &["run_tests".to_string(), "create_pr".to_string()],
        )
        .unwrap();
        assert!(rendered.contains("Run the test suite"));
        assert!(rendered.contains("Open a pull request"));
    }

    #[test]
    fn rejection_history_surfaces_in_review_section() {
        let template = "{{ review_section }}";
        let entries = vec![ThreadEntry {
            role: "rejection".to_string(),
            content: "flaky test, please fix".to_string(),
            timestamp: chrono::Utc::now(),
            author: Some("bob".to_string()),
        }];
        let rendered = render_prompt(
            "implementer",
            &sample_task(),
            template,
            "",
            &entries,
            None,
            "scripts/",
            &[],
        )
        .unwrap();
        assert!(rendered.contains("flaky test, please fix"));
    }
}
