pub mod history;
pub mod init;
pub mod messages;
pub mod sync;

use anyhow::Result;
use serde::Serialize;

/// Every command writes exactly one JSON document to stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
