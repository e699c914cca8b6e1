use crate::status::StatusEntry;
use gitchat_core::error::SyncError;
use std::path::{Path, PathBuf};

/// The sync engine's only channel to the working tree and the remote.
///
/// Every method maps to one version-control invocation run inside `worktree`.
/// Implementations must not retry; a failure is reported as-is.
pub trait VcsAdapter: Send + Sync {
    /// `rev-parse --show-toplevel`; the root of the working tree containing `worktree`.
    fn detect_repo(&self, worktree: &Path) -> Result<PathBuf, SyncError>;
    /// `init`, then point HEAD at `branch` so the first push targets it.
    fn init(&self, worktree: &Path, branch: &str) -> Result<(), SyncError>;
    /// `remote get-url <remote>`
    fn remote_url(&self, worktree: &Path, remote: &str) -> Result<String, SyncError>;
    /// `remote add <remote> <url>`
    fn add_remote(&self, worktree: &Path, remote: &str, url: &str) -> Result<(), SyncError>;
    /// `ls-remote --heads <remote> <branch>`
    fn remote_has_branch(&self, worktree: &Path, remote: &str, branch: &str)
    -> Result<bool, SyncError>;
    /// `add -f <path>`, bypassing ignore rules.
    fn add_force(&self, worktree: &Path, path: &Path) -> Result<(), SyncError>;
    /// `commit -m <message>`
    fn commit(&self, worktree: &Path, message: &str) -> Result<(), SyncError>;
    /// `pull --rebase <remote> <branch>`
    fn pull_rebase(&self, worktree: &Path, remote: &str, branch: &str) -> Result<(), SyncError>;
    /// `pull --no-rebase <remote> <branch>` (fetch + merge)
    fn pull_merge(&self, worktree: &Path, remote: &str, branch: &str) -> Result<(), SyncError>;
    /// `push [-u] <remote> <branch>`
    fn push(
        &self,
        worktree: &Path,
        remote: &str,
        branch: &str,
        set_upstream: bool,
    ) -> Result<(), SyncError>;
    /// `rev-parse HEAD`
    fn resolve_head(&self, worktree: &Path) -> Result<String, SyncError>;
    /// `status --porcelain --untracked-files=all -- <pathspec>`
    fn status(&self, worktree: &Path, pathspec: &Path) -> Result<Vec<StatusEntry>, SyncError>;
    /// `log -n1 --format=%H -- <path>`; `None` when the path was never committed.
    fn last_commit_touching(&self, worktree: &Path, path: &Path)
    -> Result<Option<String>, SyncError>;
    /// `merge-base --is-ancestor <commit> <remote>/<branch>`
    fn is_pushed(
        &self,
        worktree: &Path,
        commit: &str,
        remote: &str,
        branch: &str,
    ) -> Result<bool, SyncError>;
}
