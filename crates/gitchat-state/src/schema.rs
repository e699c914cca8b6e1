use gitchat_core::constants::SCHEMA_VERSION;
use gitchat_core::error::StateError;
use rusqlite::Connection;
use tracing::info;

/// Current schema version. Bump this when adding a new migration step.
pub const CURRENT_SCHEMA_VERSION: u32 = SCHEMA_VERSION;

/// Create the message tables and run any pending migrations.
pub fn create_tables(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(SCHEMA_SQL).map_err(StateError::sqlite)?;
    migrate(conn)?;
    info!("SQLite schema ready (version {})", CURRENT_SCHEMA_VERSION);
    Ok(())
}

/// Run incremental schema migrations up to `CURRENT_SCHEMA_VERSION`.
///
/// The `schema_migrations` table tracks which version has been applied.
pub fn migrate(conn: &Connection) -> Result<(), StateError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .map_err(StateError::sqlite)?;

    let current = applied_version(conn)?;
    if current > CURRENT_SCHEMA_VERSION {
        return Err(StateError::SchemaMigrationRequired {
            current,
            required: CURRENT_SCHEMA_VERSION,
        });
    }

    type MigrationFn = fn(&Connection) -> Result<(), StateError>;

    // Indexed by version (1-based: index 0 = V1, etc.)
    let migrations: &[MigrationFn] = &[
        // V1: baseline, created by SCHEMA_SQL
        |_conn| Ok(()),
        // V2: index backing the unsynced scan.
        |conn| {
            conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_messages_synced_created
                     ON messages(synced, created_at);",
            )
            .map_err(StateError::sqlite)
        },
    ];

    for version in (current + 1)..=CURRENT_SCHEMA_VERSION {
        let idx = (version - 1) as usize;
        if idx < migrations.len() {
            migrations[idx](conn)?;
        }
        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(StateError::sqlite)?;
        info!(version, "Applied schema migration");
    }

    Ok(())
}

pub fn applied_version(conn: &Connection) -> Result<u32, StateError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(StateError::sqlite)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    git_commit_hash TEXT,
    synced INTEGER NOT NULL DEFAULT 0,
    CHECK ((synced = 1) = (git_commit_hash IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_messages_created ON messages(created_at);
"#;
