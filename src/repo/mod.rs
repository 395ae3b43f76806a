//! Repository manager: typed `git`/`gh` operations run through the shared
//! subprocess layer.
//!
//! Every operation carries the same timeouts the Python orchestrator used
//! (`repo_manager.py`): 120s for rebase/push, 60s for fetch and `gh`
//! mutations, 30s for `gh pr view` lookups. Nothing here calls `git2`; a
//! worktree is just a directory and a branch name, and shelling out keeps
//! the same process boundary (and the same mockability) as every other
//! subprocess in this crate.

mod error;

pub use error::RepoError;

use crate::subprocess::{ProcessCommandBuilder, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const GIT_TIMEOUT: Duration = Duration::from_secs(120);
const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);
const GH_TIMEOUT: Duration = Duration::from_secs(60);
const GH_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStatus {
    pub branch: String,
    pub commits_ahead: u32,
    pub has_uncommitted: bool,
    pub head_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseStatus {
    Success,
    Conflict,
    UpToDate,
    Error,
}

#[derive(Debug, Clone)]
pub struct RebaseResult {
    pub status: RebaseStatus,
    pub message: String,
    pub conflict_output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrInfo {
    pub url: String,
    pub number: Option<u64>,
    pub created: bool,
}

/// Wraps a worktree directory with `git`/`gh` operations.
pub struct RepoManager {
    runner: Arc<dyn ProcessRunner>,
    worktree: PathBuf,
}

impl RepoManager {
    pub fn new(runner: Arc<dyn ProcessRunner>, worktree: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            worktree: worktree.into(),
        }
    }

    pub fn worktree_path(&self) -> &Path {
        &self.worktree
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    async fn run_git(&self, args: &[&str], timeout: Duration) -> Result<String, RepoError> {
        let output = self
            .runner
            .run(
                ProcessCommandBuilder::new("git")
                    .args(args)
                    .current_dir(&self.worktree)
                    .timeout(timeout)
                    .build(),
            )
            .await?;
        if !output.status.success() {
            return Err(RepoError::GitFailed(format!(
                "git {}: {}",
                args.join(" "),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout.trim().to_string())
    }

    async fn run_gh(&self, args: &[&str], timeout: Duration) -> Result<(bool, String), RepoError> {
        let output = self
            .runner
            .run(
                ProcessCommandBuilder::new("gh")
                    .args(args)
                    .current_dir(&self.worktree)
                    .timeout(timeout)
                    .build(),
            )
            .await?;
        Ok((output.status.success(), output.stdout.trim().to_string()))
    }

    pub async fn get_status(&self) -> Result<RepoStatus, RepoError> {
        let branch = self
            .run_git(&["rev-parse", "--abbrev-ref", "HEAD"], GIT_TIMEOUT)
            .await?;
        let head_ref = self.run_git(&["rev-parse", "HEAD"], GIT_TIMEOUT).await?;
        let porcelain = self
            .run_git(&["status", "--porcelain"], GIT_TIMEOUT)
            .await?;
        let has_uncommitted = !porcelain.is_empty();

        let commits_ahead = match self
            .run_git(
                &["rev-list", "--count", "@{upstream}..HEAD"],
                GIT_TIMEOUT,
            )
            .await
        {
            Ok(count) => count.parse().unwrap_or(0),
            Err(_) => 0,
        };

        Ok(RepoStatus {
            branch,
            commits_ahead,
            has_uncommitted,
            head_ref,
        })
    }

    /// Ensure the worktree is on `branch`. A no-op if already there; creates
    /// the branch from a detached HEAD; refuses to switch off a different
    /// named branch (that would silently discard an in-progress task).
    pub async fn ensure_on_branch(&self, branch: &str) -> Result<(), RepoError> {
        let current = self
            .run_git(&["rev-parse", "--abbrev-ref", "HEAD"], GIT_TIMEOUT)
            .await?;
        if current == branch {
            return Ok(());
        }
        if current == "HEAD" {
            self.run_git(&["checkout", "-b", branch], GIT_TIMEOUT).await?;
            return Ok(());
        }
        Err(RepoError::WrongBranch {
            expected: branch.to_string(),
            actual: current,
        })
    }

    pub async fn push_branch(&self, branch: &str, force: bool) -> Result<(), RepoError> {
        let current = self
            .run_git(&["rev-parse", "--abbrev-ref", "HEAD"], GIT_TIMEOUT)
            .await?;
        if current == "HEAD" {
            return Err(RepoError::DetachedHead);
        }
        let mut args = vec!["push", "-u"];
        if force {
            args.push("--force-with-lease");
        }
        args.push("origin");
        args.push(branch);
        self.run_git(&args, GIT_TIMEOUT).await?;
        Ok(())
    }

    /// Rebase the current branch onto `base`, short-circuiting to
    /// `UpToDate` when there's nothing to rebase and aborting cleanly on
    /// conflict (the caller decides what to do with a conflicted worktree).
    pub async fn rebase_on_base(&self, base: &str) -> Result<RebaseResult, RepoError> {
        self.run_git(&["fetch", "origin", base], GIT_FETCH_TIMEOUT)
            .await?;

        let behind = self
            .run_git(
                &["rev-list", "--count", &format!("HEAD..origin/{base}")],
                GIT_TIMEOUT,
            )
            .await?
            .parse::<u32>()
            .unwrap_or(0);

        if behind == 0 {
            return Ok(RebaseResult {
                status: RebaseStatus::UpToDate,
                message: format!("already up to date with {base}"),
                conflict_output: None,
            });
        }

        let output = self
            .runner
            .run(
                ProcessCommandBuilder::new("git")
                    .args(["rebase", &format!("origin/{base}")])
                    .current_dir(&self.worktree)
                    .timeout(GIT_TIMEOUT)
                    .build(),
            )
            .await?;

        if output.status.success() {
            return Ok(RebaseResult {
                status: RebaseStatus::Success,
                message: format!("rebased onto {base}"),
                conflict_output: None,
            });
        }

        self.runner
            .run(
                ProcessCommandBuilder::new("git")
                    .args(["rebase", "--abort"])
                    .current_dir(&self.worktree)
                    .timeout(GIT_TIMEOUT)
                    .suppress_stderr()
                    .build(),
            )
            .await
            .ok();

        Ok(RebaseResult {
            status: RebaseStatus::Conflict,
            message: format!("rebase onto {base} conflicted, aborted"),
            conflict_output: Some(output.stderr),
        })
    }

    pub async fn reset_to_base(&self, base: &str) -> Result<(), RepoError> {
        self.run_git(&["fetch", "origin", base], GIT_FETCH_TIMEOUT)
            .await?;
        self.run_git(&["reset", "--hard", &format!("origin/{base}")], GIT_TIMEOUT)
            .await?;
        Ok(())
    }

    /// Open a PR for `branch`, idempotently: checks for an existing open PR
    /// first, and if `gh pr create` reports one already exists, retries the
    /// lookup once rather than treating that as a hard failure.
    pub async fn create_pr(&self, branch: &str, title: &str, body: &str) -> Result<PrInfo, RepoError> {
        if let Some(info) = self.lookup_pr(branch).await? {
            return Ok(info);
        }

        let (success, output) = self
            .run_gh(
                &["pr", "create", "--head", branch, "--title", title, "--body", body],
                GH_TIMEOUT,
            )
            .await?;

        if success {
            return Ok(PrInfo {
                url: output,
                number: None,
                created: true,
            });
        }

        if output.contains("already exists") {
            if let Some(info) = self.lookup_pr(branch).await? {
                return Ok(info);
            }
        }

        Err(RepoError::PrFailed(branch.to_string()))
    }

    async fn lookup_pr(&self, branch: &str) -> Result<Option<PrInfo>, RepoError> {
        let (success, output) = self
            .run_gh(
                &["pr", "view", branch, "--json", "url,number"],
                GH_LOOKUP_TIMEOUT,
            )
            .await?;
        if !success {
            return Ok(None);
        }
        let parsed: serde_json::Value = serde_json::from_str(&output)
            .map_err(|e| RepoError::GhFailed(format!("unparseable pr view output: {e}")))?;
        Ok(Some(PrInfo {
            url: parsed["url"].as_str().unwrap_or_default().to_string(),
            number: parsed["number"].as_u64(),
            created: false,
        }))
    }

    pub async fn merge_pr(&self, branch: &str) -> Result<bool, RepoError> {
        let (success, _) = self
            .run_gh(&["pr", "merge", branch, "--squash"], GH_TIMEOUT)
            .await?;
        Ok(success)
    }

    pub async fn push_submodule(&self, submodule_path: &Path, branch: &str) -> Result<(), RepoError> {
        let output = self
            .runner
            .run(
                ProcessCommandBuilder::new("git")
                    .args(["push", "origin", branch])
                    .current_dir(&self.worktree.join(submodule_path))
                    .timeout(GIT_TIMEOUT)
                    .build(),
            )
            .await?;
        if !output.status.success() {
            return Err(RepoError::GitFailed(output.stderr));
        }
        Ok(())
    }

    pub async fn stage_submodule_pointer(&self, submodule_path: &Path) -> Result<(), RepoError> {
        let path_str = submodule_path.to_string_lossy();
        self.run_git(&["add", &path_str], GIT_TIMEOUT).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::SubprocessManager;

    #[tokio::test]
    async fn ensure_on_branch_is_noop_when_already_there() {
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_command("git")
            .with_args(|a| a == ["rev-parse", "--abbrev-ref", "HEAD"])
            .returns_stdout("feature/foo")
            .returns_success()
            .finish();
        let repo = RepoManager::new(subprocess.runner(), PathBuf::from("/tmp/worktree"));
        repo.ensure_on_branch("feature/foo").await.unwrap();
    }

    #[tokio::test]
    async fn ensure_on_branch_rejects_different_named_branch() {
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_command("git")
            .with_args(|a| a == ["rev-parse", "--abbrev-ref", "HEAD"])
            .returns_stdout("main")
            .returns_success()
            .finish();
        let repo = RepoManager::new(subprocess.runner(), PathBuf::from("/tmp/worktree"));
        let result = repo.ensure_on_branch("feature/foo").await;
        assert!(matches!(result, Err(RepoError::WrongBranch { .. })));
    }

    #[tokio::test]
    async fn rebase_short_circuits_when_up_to_date() {
        let (subprocess, mock) = SubprocessManager::mock();
        mock.expect_command("git")
            .with_args(|a| a.first().map(String::as_str) == Some("fetch"))
            .returns_success()
            .finish();
        mock.expect_command("git")
            .with_args(|a| a.first().map(String::as_str) == Some("rev-list"))
            .returns_stdout("0")
            .returns_success()
            .finish();
        let repo = RepoManager::new(subprocess.runner(), PathBuf::from("/tmp/worktree"));
        let result = repo.rebase_on_base("main").await.unwrap();
        assert_eq!(result.status, RebaseStatus::UpToDate);
    }
}
