use gitchat_core::error::ConfigError;
use std::path::{Path, PathBuf};

/// Find the working-tree root at or above `start`.
/// Bare repositories have no working tree and are rejected.
pub fn discover_worktree(start: &Path) -> Result<PathBuf, ConfigError> {
    let no_root = || ConfigError::NoRepositoryRoot {
        path: start.display().to_string(),
    };
    let repo = git2::Repository::discover(start).map_err(|_| no_root())?;
    let workdir = repo.workdir().ok_or_else(no_root)?;
    Ok(workdir.to_path_buf())
}
