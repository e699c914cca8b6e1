use super::print_json;
use crate::coordinator::Coordinator;
use anyhow::Result;

pub fn run(coordinator: &Coordinator, limit: usize) -> Result<()> {
    let commits = coordinator.history(limit)?;
    print_json(&commits)
}
