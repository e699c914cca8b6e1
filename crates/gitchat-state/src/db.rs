use gitchat_core::config::StorageConfig;
use gitchat_core::error::StateError;
use rusqlite::Connection;
use std::path::Path;
use tracing::info;

/// Open a SQLite connection with default pragmas.
pub fn open_connection(db_path: &Path) -> Result<Connection, StateError> {
    open_connection_with_config(db_path, 5000, -64000)
}

/// Open a SQLite connection using the `[storage]` section.
pub fn open_from_config(db_path: &Path, storage: &StorageConfig) -> Result<Connection, StateError> {
    open_connection_with_config(db_path, storage.busy_timeout_ms, storage.cache_size)
}

/// Open a SQLite connection with configurable pragmas.
pub fn open_connection_with_config(
    db_path: &Path,
    busy_timeout_ms: u32,
    cache_size: i32,
) -> Result<Connection, StateError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(StateError::Io)?;
    }

    let conn = Connection::open(db_path).map_err(StateError::sqlite)?;

    apply_pragmas(&conn, busy_timeout_ms, cache_size)?;

    info!(?db_path, "SQLite connection opened");
    Ok(conn)
}

fn apply_pragmas(
    conn: &Connection,
    busy_timeout_ms: u32,
    cache_size: i32,
) -> Result<(), StateError> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {};
         PRAGMA cache_size = {};",
        busy_timeout_ms, cache_size
    ))
    .map_err(StateError::sqlite)?;
    Ok(())
}
