use super::print_json;
use crate::coordinator::Coordinator;
use anyhow::Result;

/// Store rows by default; `worktree_only` shows pending files in the working tree instead.
pub fn unsynced(coordinator: &Coordinator, worktree_only: bool) -> Result<()> {
    if worktree_only {
        print_json(&coordinator.unsynced_files()?)
    } else {
        print_json(&coordinator.unsynced()?)
    }
}

pub fn retry(coordinator: &Coordinator) -> Result<()> {
    let report = coordinator.retry()?;
    print_json(&report)?;
    if let Some(failure) = report.failed {
        anyhow::bail!("retry stopped at message {}: {}", failure.id, failure.error);
    }
    Ok(())
}

pub fn pull(coordinator: &Coordinator) -> Result<()> {
    let report = coordinator.pull()?;
    print_json(&report)
}
