use super::{Step, StepContext, StepError};
use crate::client::TaskUpdate;
use crate::repo::RebaseStatus;
use crate::subprocess::ProcessCommandBuilder;
use async_trait::async_trait;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(600);

pub struct PushBranch;

#[async_trait]
impl Step for PushBranch {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let branch = format!("agent/{}", ctx.task.id);
        ctx.repo.ensure_on_branch(&branch).await?;
        ctx.repo.push_branch(&branch, false).await?;
        Ok(())
    }
}

pub struct RunTests;

#[async_trait]
impl Step for RunTests {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let worktree = ctx.repo.worktree_path().to_path_buf();
        let command = detect_test_runner(&worktree)?;

        let mut path = std::env::var("PATH").unwrap_or_default();
        for shim in ["/usr/local/bin", &format!("{}/.volta/bin", home_dir())] {
            path = format!("{path}:{shim}");
        }

        let output = ctx
            .repo
            .runner()
            .run(
                ProcessCommandBuilder::new(command.0)
                    .args(command.1.iter().map(|s| s.as_str()))
                    .current_dir(&worktree)
                    .env("PATH", &path)
                    .timeout(TEST_TIMEOUT)
                    .build(),
            )
            .await?;

        if !output.status.success() {
            return Err(StepError::TestsFailed(output.stderr));
        }
        Ok(())
    }
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_default()
}

/// Detect a test runner from marker files in the worktree root, mirroring
/// `repo_manager.py`'s ad hoc project-type sniffing.
fn detect_test_runner(worktree: &std::path::Path) -> Result<(&'static str, Vec<String>), StepError> {
    if worktree.join("pytest.ini").exists() || worktree.join("setup.cfg").exists() {
        return Ok(("pytest", vec![]));
    }
    if let Ok(pyproject) = std::fs::read_to_string(worktree.join("pyproject.toml")) {
        if pyproject.contains("[tool.pytest") {
            return Ok(("pytest", vec![]));
        }
    }
    if worktree.join("package.json").exists() {
        return Ok(("npm", vec!["test".to_string()]));
    }
    if let Ok(makefile) = std::fs::read_to_string(worktree.join("Makefile")) {
        if makefile.lines().any(|l| l.starts_with("test:")) {
            return Ok(("make", vec!["test".to_string()]));
        }
    }
    Err(StepError::NoTestRunner(worktree.to_path_buf()))
}

pub struct CreatePr;

#[async_trait]
impl Step for CreatePr {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let branch = format!("agent/{}", ctx.task.id);
        let title = format!("[{}] {}", ctx.task.id, ctx.task.role);
        let body = ctx
            .result
            .comment
            .clone()
            .unwrap_or_else(|| "Automated submission.".to_string());

        let pr = ctx.repo.create_pr(&branch, &title, &body).await?;

        ctx.client
            .update_task(
                &ctx.task.id,
                &TaskUpdate {
                    pr_url: Some(pr.url.clone()),
                    pr_number: pr.number,
                    ..Default::default()
                },
            )
            .await?;

        ctx.task.pr_url = Some(pr.url);
        ctx.task.pr_number = pr.number;
        Ok(())
    }
}

pub struct MergePr;

#[async_trait]
impl Step for MergePr {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let branch = format!("agent/{}", ctx.task.id);
        let merged = ctx.repo.merge_pr(&branch).await?;
        if !merged {
            ctx.client
                .update_task(
                    &ctx.task.id,
                    &TaskUpdate {
                        needs_rebase: Some(true),
                        ..Default::default()
                    },
                )
                .await?;
            ctx.task.needs_rebase = true;
            return Err(StepError::MergeBlocked(format!(
                "gh pr merge failed for branch {branch}, marked needs_rebase"
            )));
        }
        Ok(())
    }
}

pub struct RebaseOnMain;

#[async_trait]
impl Step for RebaseOnMain {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        rebase_on(ctx, "main").await
    }
}

pub struct RebaseOnProjectBranch;

#[async_trait]
impl Step for RebaseOnProjectBranch {
    async fn run(&self, ctx: &mut StepContext) -> Result<(), StepError> {
        let base = ctx
            .task
            .project_id
            .clone()
            .map(|id| format!("project/{id}"))
            .unwrap_or_else(|| "main".to_string());
        rebase_on(ctx, &base).await
    }
}

async fn rebase_on(ctx: &mut StepContext, base: &str) -> Result<(), StepError> {
    let result = ctx.repo.rebase_on_base(base).await?;
    match result.status {
        RebaseStatus::Success | RebaseStatus::UpToDate => Ok(()),
        RebaseStatus::Conflict => Err(StepError::MergeBlocked(result.message)),
        RebaseStatus::Error => Err(StepError::MergeBlocked(result.message)),
    }
}
