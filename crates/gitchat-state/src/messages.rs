use gitchat_core::config::StorageConfig;
use gitchat_core::error::{self, StateError};
use gitchat_core::time::now_iso8601;
use gitchat_core::types::{Message, Pagination, validate_content};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{debug, info, warn};

const SELECT_COLUMNS: &str = "SELECT id, content, created_at, git_commit_hash, synced FROM messages";

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: row.get(2)?,
        git_commit_hash: row.get(3)?,
        synced: row.get::<_, i64>(4)? != 0,
    })
}

/// Insert a new unsynced message stamped with `created_at` and return its id.
pub fn insert_message(conn: &Connection, content: &str, created_at: &str) -> Result<i64, StateError> {
    conn.execute(
        "INSERT INTO messages (content, created_at, git_commit_hash, synced)
         VALUES (?1, ?2, NULL, 0)",
        params![content, created_at],
    )
    .map_err(StateError::sqlite)?;
    Ok(conn.last_insert_rowid())
}

pub fn get_message(conn: &Connection, id: i64) -> Result<Option<Message>, StateError> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id],
        message_from_row,
    )
    .optional()
    .map_err(StateError::sqlite)
}

/// Most recent first. Equal timestamps fall back to id so pages never overlap.
pub fn list_messages(conn: &Connection, page: Pagination) -> Result<Vec<Message>, StateError> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
        ))
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map(params![page.limit, page.offset], message_from_row)
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StateError::sqlite)
}

/// Returns `false` when no row has this id.
pub fn set_sync_status(conn: &Connection, id: i64, commit_hash: &str) -> Result<bool, StateError> {
    let changed = conn
        .execute(
            "UPDATE messages SET git_commit_hash = ?2, synced = 1 WHERE id = ?1",
            params![id, commit_hash],
        )
        .map_err(StateError::sqlite)?;
    Ok(changed > 0)
}

/// Oldest first, the order in which they should be retried.
pub fn list_unsynced(conn: &Connection) -> Result<Vec<Message>, StateError> {
    let mut stmt = conn
        .prepare(&format!(
            "{SELECT_COLUMNS} WHERE synced = 0 ORDER BY created_at ASC, id ASC"
        ))
        .map_err(StateError::sqlite)?;
    let rows = stmt
        .query_map([], message_from_row)
        .map_err(StateError::sqlite)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(StateError::sqlite)
}

pub fn count_messages(conn: &Connection) -> Result<u64, StateError> {
    conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        .map_err(StateError::sqlite)
}

pub fn delete_all(conn: &Connection) -> Result<usize, StateError> {
    conn.execute("DELETE FROM messages", [])
        .map_err(StateError::sqlite)
}

/// Relational message persistence.
///
/// Owns one connection; construct it once and pass it by reference to callers.
pub struct MessageStore {
    conn: Connection,
}

impl MessageStore {
    /// Open (or create) the database at `db_path` and bring the schema up to date.
    pub fn open(db_path: &Path) -> error::Result<Self> {
        let conn = crate::db::open_connection(db_path)?;
        Self::from_connection(conn)
    }

    /// Open with the pragmas from the `[storage]` config section.
    pub fn open_with_config(db_path: &Path, storage: &StorageConfig) -> error::Result<Self> {
        let conn = crate::db::open_from_config(db_path, storage)?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> error::Result<Self> {
        crate::schema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert an unsynced message. Content must not be blank.
    pub fn create(&self, content: &str) -> error::Result<i64> {
        validate_content(content)?;
        let id = insert_message(&self.conn, content, &now_iso8601())?;
        debug!(id, "message created");
        Ok(id)
    }

    /// `create` followed by `get`.
    pub fn add(&self, content: &str) -> error::Result<Message> {
        let id = self.create(content)?;
        self.get(id)
    }

    pub fn get(&self, id: i64) -> error::Result<Message> {
        get_message(&self.conn, id)?.ok_or_else(|| StateError::not_found(id).into())
    }

    pub fn list(&self, page: Pagination) -> error::Result<Vec<Message>> {
        Ok(list_messages(&self.conn, page)?)
    }

    /// Attach the commit hash and mark the message synced.
    pub fn update_sync_status(&self, id: i64, commit_hash: &str) -> error::Result<()> {
        let commit_hash = commit_hash.trim();
        if commit_hash.is_empty() {
            return Err(gitchat_core::ValidationError::invalid_argument(
                "commit_hash",
                commit_hash,
                "must not be empty",
            )
            .into());
        }
        let existing = get_message(&self.conn, id)?.ok_or_else(|| StateError::not_found(id))?;
        // A row is marked synced once; repeating the same hash is a no-op.
        match existing.git_commit_hash.as_deref() {
            Some(previous) if previous == commit_hash => return Ok(()),
            Some(previous) => {
                warn!(id, previous, commit = commit_hash, "refusing to replace commit hash");
                return Err(gitchat_core::ValidationError::invalid_argument(
                    "commit_hash",
                    commit_hash,
                    format!("message {id} is already synced at {previous}"),
                )
                .into());
            }
            None => {}
        }
        if !set_sync_status(&self.conn, id, commit_hash)? {
            return Err(StateError::not_found(id).into());
        }
        info!(id, commit = commit_hash, "message marked synced");
        Ok(())
    }

    pub fn list_unsynced(&self) -> error::Result<Vec<Message>> {
        Ok(list_unsynced(&self.conn)?)
    }

    pub fn count(&self) -> error::Result<u64> {
        Ok(count_messages(&self.conn)?)
    }

    /// Administrative: remove every message row.
    pub fn clear(&self) -> error::Result<usize> {
        let removed = delete_all(&self.conn)?;
        warn!(removed, "all messages cleared");
        Ok(removed)
    }
}
