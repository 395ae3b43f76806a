//! Scaffolds `.octopoid/` in a project: config, agent blueprints, the
//! built-in flows, and starter prompt templates.
//!
//! Grounded on the teacher's `init::templates`/`init::command` pairing:
//! static template strings written out verbatim, skipped when the target
//! already exists unless the caller passes `force`.

use crate::config::{agents_config_path, config_path, octopoid_dir};
use crate::flow::{generate_default_flow, generate_project_flow};
use anyhow::{Context, Result};
use std::path::Path;

const CONFIG_TEMPLATE: &str = r#"server:
  url: "http://localhost:8000"
  api_key: "replace-me"
cluster: default
"#;

const AGENTS_TEMPLATE: &str = r#"circuit_breaker_threshold: 3
agent_timeout: 3m
blueprints:
  - blueprint_name: implementer
    role: implementer
    max_instances: 4
    agent_hooks:
      - run_tests
      - create_pr
  - blueprint_name: gatekeeper
    role: gatekeeper
    max_instances: 2
    role_filter: gatekeeper
"#;

const IMPLEMENTER_PROMPT: &str = r#"You are implementing task {{ task_id }}: {{ task_title }}

{{ task_content }}

{{ review_section }}
{{ continuation_section }}
{{ required_steps }}
"#;

const GATEKEEPER_PROMPT: &str = r#"You are reviewing task {{ task_id }}: {{ task_title }} on branch {{ task_branch }}.

Check the change for correctness and fit. Approve, reject with feedback, or
leave it for human review by writing `result.json` with a `decision` field.
"#;

const DISPATCHER_PROMPT: &str = "You act on commands the human operator sends the orchestrator between ticks.";

/// Write `.octopoid/{config.yaml,agents.yaml,flows/*.yaml,prompts/*.md}`
/// under `project_root`. Existing files are left untouched unless `force`.
pub async fn scaffold(project_root: &Path, force: bool) -> Result<()> {
    let octopoid_dir = octopoid_dir(project_root);
    let flows_dir = octopoid_dir.join("flows");
    let prompts_dir = octopoid_dir.join("prompts");

    tokio::fs::create_dir_all(&flows_dir)
        .await
        .context("failed to create .octopoid/flows")?;
    tokio::fs::create_dir_all(&prompts_dir)
        .await
        .context("failed to create .octopoid/prompts")?;

    write_if_absent(&config_path(project_root), CONFIG_TEMPLATE, force).await?;
    write_if_absent(&agents_config_path(project_root), AGENTS_TEMPLATE, force).await?;

    write_if_absent(
        &flows_dir.join("default.yaml"),
        &generate_default_flow().to_yaml_string()?,
        force,
    )
    .await?;
    write_if_absent(
        &flows_dir.join("project.yaml"),
        &generate_project_flow().to_yaml_string()?,
        force,
    )
    .await?;

    write_if_absent(&prompts_dir.join("implementer.md"), IMPLEMENTER_PROMPT, force).await?;
    write_if_absent(&prompts_dir.join("gatekeeper.md"), GATEKEEPER_PROMPT, force).await?;
    write_if_absent(&prompts_dir.join("dispatcher.md"), DISPATCHER_PROMPT, force).await?;

    println!("initialized .octopoid in {}", project_root.display());
    Ok(())
}

async fn write_if_absent(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("skipping {} (already exists)", path.display());
        return Ok(());
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scaffold_writes_every_expected_file() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false).await.unwrap();

        let octopoid_dir = octopoid_dir(dir.path());
        assert!(config_path(dir.path()).exists());
        assert!(agents_config_path(dir.path()).exists());
        assert!(octopoid_dir.join("flows/default.yaml").exists());
        assert!(octopoid_dir.join("flows/project.yaml").exists());
        assert!(octopoid_dir.join("prompts/implementer.md").exists());
        assert!(octopoid_dir.join("prompts/gatekeeper.md").exists());
        assert!(octopoid_dir.join("prompts/dispatcher.md").exists());
    }

    #[tokio::test]
    async fn scaffold_does_not_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false).await.unwrap();
        tokio::fs::write(config_path(dir.path()), "custom").await.unwrap();

        scaffold(dir.path(), false).await.unwrap();
        let contents = tokio::fs::read_to_string(config_path(dir.path())).await.unwrap();
        assert_eq!(contents, "custom");
    }
}
