//! Worktree materialization: one `git worktree` per running agent instance,
//! checked out onto `agent/<branch>` so concurrent agents never collide on
//! the same working directory.
//!
//! Grounded on the teacher's `worktree::manager` atomic-update pattern
//! (write to a temp path, rename into place) applied here to worktree
//! creation: `git worktree add` is itself atomic from git's point of view,
//! so there's no separate temp-file dance needed, just a pre-existence
//! check to make materialization idempotent across ticks.

use crate::subprocess::{ProcessCommandBuilder, ProcessRunner};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

fn sanitize(branch: &str) -> String {
    branch.replace(['/', ' '], "-")
}

pub async fn materialize(
    runner: Arc<dyn ProcessRunner>,
    project_root: &Path,
    branch: &str,
) -> std::io::Result<PathBuf> {
    let worktree_path = project_root
        .join(".octopoid")
        .join("worktrees")
        .join(sanitize(branch));

    if worktree_path.exists() {
        return Ok(worktree_path);
    }

    std::fs::create_dir_all(worktree_path.parent().expect("worktrees dir has a parent"))?;

    let output = runner
        .run(
            ProcessCommandBuilder::new("git")
                .args(["worktree", "add", "-B", branch])
                .arg(&worktree_path.to_string_lossy())
                .current_dir(project_root)
                .timeout(WORKTREE_TIMEOUT)
                .build(),
        )
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "git worktree add failed: {}",
            output.stderr
        )));
    }

    Ok(worktree_path)
}
