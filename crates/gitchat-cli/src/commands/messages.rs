use super::print_json;
use crate::coordinator::Coordinator;
use anyhow::{Result, bail};
use serde_json::json;

pub fn post(coordinator: &Coordinator, content: &str) -> Result<()> {
    let message = coordinator.post(content)?;
    print_json(&message)
}

pub fn list(coordinator: &Coordinator, limit: Option<&str>, offset: Option<&str>) -> Result<()> {
    let messages = coordinator.list(limit, offset)?;
    print_json(&messages)
}

pub fn get(coordinator: &Coordinator, id: i64) -> Result<()> {
    let message = coordinator.get(id)?;
    print_json(&message)
}

pub fn clear(coordinator: &Coordinator, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete every message without --yes");
    }
    let removed = coordinator.clear()?;
    print_json(&json!({ "removed": removed }))
}
