//! git::clone
//!
//! Local clone reconciliation against a cache of kept repositories.
//!
//! # Design
//!
//! A repository working copy lives at `{work_root}/{search}/{code}/{project}/{repo}`,
//! a cached copy at `{cache_root}/{project}/{repo}`. `copy_if` restores a
//! working copy from cache and puts it on the target branch; `save_copy`
//! banks a finished working copy into the cache. Every subprocess step and
//! logical milestone appends exactly one ordered [`Action`]; the history is
//! the user-facing explanation of what happened, success or not.
//!
//! Cancellation leaves no rollback: a partial copy without its `.git` marker
//! looks like no copy at all and is re-attempted on the next call. That makes
//! re-invocation safe even after an abandoned task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::CodeHostSettings;
use crate::search::SearchResult;

use super::process::{Action, ApplyOutput, ProcessRunner};

/// Outcome of a reconciliation: the ordered history plus a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneResult {
    pub actions: Vec<Action>,
    pub success: bool,
}

impl CloneResult {
    fn failure(actions: Vec<Action>) -> Self {
        Self {
            actions,
            success: false,
        }
    }

    fn success(actions: Vec<Action>) -> Self {
        Self {
            actions,
            success: true,
        }
    }
}

/// Restores and saves working copies against the configured cache root.
pub struct LocalCloneReconciler {
    work_root: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl LocalCloneReconciler {
    pub fn new(work_root: impl Into<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            work_root: work_root.into(),
            runner,
        }
    }

    /// Restore a working copy from the cache, if one is kept.
    ///
    /// Short-circuits success when the working copy already exists. Answers
    /// failure with an empty history when no cache root is configured or no
    /// cached copy exists; the caller falls back to a full remote clone.
    pub async fn copy_if(
        &self,
        settings: &CodeHostSettings,
        repo: &SearchResult,
        default_branch: &str,
        target_branch: &str,
    ) -> CloneResult {
        let work_path = self.work_root.join(repo.as_path_string());
        if work_path.join(".git").exists() {
            // Never re-copy over a live clone.
            return CloneResult::success(vec![Action::new(
                "Copy",
                ApplyOutput::dummy(repo.as_path_string(), "Repo exists already", 0),
            )]);
        }

        let Some(keep) = settings.keep_local_repos() else {
            return CloneResult::failure(Vec::new());
        };
        let cache_path = keep.path.join(&repo.project).join(&repo.repo);
        if !cache_path.join(".git").exists() {
            return CloneResult::failure(Vec::new());
        }

        let mut history = Vec::new();
        // Complete the cache's history before copying it anywhere.
        self.unshallow_and_fetch(&cache_path, &mut history).await;

        if let Err(e) = copy_tree(
            &cache_path.join(".git"),
            &work_path.join(".git"),
            &repo.as_path_string(),
            &mut history,
        ) {
            let message = format!("Failed copying files from keep location due to {}", e);
            log::warn!("{}", message);
            history.push(Action::new(
                "Restore saved repo",
                ApplyOutput::dummy(
                    repo.as_path_string(),
                    format!("{}, more info in logs", message),
                    1,
                ),
            ));
            return CloneResult::failure(history);
        }

        self.checkout(default_branch, target_branch, &work_path, &mut history)
            .await;
        history.push(Action::new(
            "Restore saved repo",
            ApplyOutput::dummy(repo.as_path_string(), "Done", 0),
        ));
        CloneResult::success(history)
    }

    /// Checkout the default branch, then switch to (or create) the target.
    async fn checkout(
        &self,
        default_branch: &str,
        target_branch: &str,
        work_path: &Path,
        history: &mut Vec<Action>,
    ) {
        let output = self
            .runner
            .run(work_path, &["git", "checkout", default_branch])
            .await;
        let default_ok = output.success();
        history.push(Action::new(
            format!("git checkout default branch '{}'", default_branch),
            output,
        ));
        if target_branch != default_branch && default_ok {
            let output = self
                .runner
                .run(work_path, &["git", "checkout", target_branch])
                .await;
            let switched = output.success();
            history.push(Action::new("Switch branch", output));
            if !switched {
                // Branch does not exist locally yet.
                let output = self
                    .runner
                    .run(work_path, &["git", "checkout", "-b", target_branch])
                    .await;
                history.push(Action::new("Create branch", output));
            }
        }
    }

    /// Bank a finished working copy into the cache.
    ///
    /// No-ops with success when a cached copy already exists; a saved cache
    /// is never overwritten. The saved copy is forced non-sparse.
    pub async fn save_copy(
        &self,
        settings: &CodeHostSettings,
        repo: &SearchResult,
        default_branch: &str,
    ) -> CloneResult {
        let work_git = self.work_root.join(repo.as_path_string()).join(".git");
        if !work_git.exists() {
            return CloneResult::failure(vec![Action::new(
                "Save copy",
                ApplyOutput::dummy(repo.as_path_string(), "Repo doesn't exist", 1),
            )]);
        }

        let Some(keep) = settings.keep_local_repos() else {
            return CloneResult::failure(Vec::new());
        };
        let cache_path = keep.path.join(&repo.project).join(&repo.repo);
        let cache_git = cache_path.join(".git");
        if cache_git.exists() {
            return CloneResult::success(vec![Action::new(
                "Save copy",
                ApplyOutput::dummy(repo.as_path_string(), "Copy saved already, wont update", 0),
            )]);
        }

        let mut history = Vec::new();
        if let Err(e) = copy_tree(&work_git, &cache_git, &repo.as_path_string(), &mut history) {
            let message = format!("Failed saving copy due to {}", e);
            log::warn!("{}", message);
            history.push(Action::new(
                "Save copy",
                ApplyOutput::dummy(
                    repo.as_path_string(),
                    format!("{}, more info in logs", message),
                    1,
                ),
            ));
            return CloneResult::failure(history);
        }

        // The cache must be a full, non-sparse clone.
        let deleted_sparse = std::fs::remove_file(cache_git.join("info").join("sparse-checkout")).is_ok();
        history.push(Action::new(
            "Delete sparse checkout settings",
            ApplyOutput::dummy(
                repo.as_path_string(),
                format!("Deleted: {}", deleted_sparse),
                0,
            ),
        ));
        let output = self
            .runner
            .run(
                &cache_path,
                &["git", "config", "core.sparseCheckout", "false"],
            )
            .await;
        history.push(Action::new("Disable sparse checkout for saved copy", output));

        self.unshallow_and_fetch(&cache_path, &mut history).await;
        let output = self
            .runner
            .run(&cache_path, &["git", "checkout", default_branch])
            .await;
        history.push(Action::new(
            format!("git checkout {}", default_branch),
            output,
        ));

        CloneResult::success(history)
    }

    async fn unshallow_and_fetch(&self, dir: &Path, history: &mut Vec<Action>) {
        let output = self.runner.run(dir, &["git", "fetch", "--unshallow"]).await;
        history.push(Action::new("git fetch --unshallow", output));
        let output = self.runner.run(dir, &["git", "fetch", "--all"]).await;
        history.push(Action::new("git fetch --all", output));
    }
}

/// Recursive copy where individual file failures are recorded and skipped.
///
/// Only a failure to read or create a directory is fatal; those abort the
/// whole copy.
fn copy_tree(
    source: &Path,
    target: &Path,
    repo_label: &str,
    history: &mut Vec<Action>,
) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&from, &to, repo_label, history)?;
        } else if let Err(e) = std::fs::copy(&from, &to) {
            let message = format!("File copy failed: '{}', due to {}", from.display(), e);
            log::warn!("{}", message);
            history.push(Action::new(
                "File copy fail",
                ApplyOutput::dummy(repo_label, message, 1),
            ));
        }
    }
    Ok(())
}
