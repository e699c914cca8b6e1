use super::print_json;
use crate::coordinator::Coordinator;
use anyhow::Result;
use gitchat_core::config::Config;
use serde_json::json;
use std::path::Path;

pub fn run(worktree: &Path, remote_url: Option<&str>, config: Config) -> Result<()> {
    let coordinator = match remote_url {
        Some(url) => Coordinator::bootstrap(worktree, url, config)?,
        None => Coordinator::open(worktree, config)?,
    };
    let commit = coordinator.initialize()?;
    let engine = coordinator.engine();

    print_json(&json!({
        "worktree": engine.worktree().display().to_string(),
        "remote": engine.identity().to_string(),
        "clone_url": engine.identity().clone_url(),
        "messages_dir": engine.projector().relative_dir().display().to_string(),
        "initialized": commit.is_some(),
        "commit": commit,
    }))
}
