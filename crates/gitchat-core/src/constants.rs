/// Default data directory name under home.
pub const DEFAULT_DATA_DIR: &str = ".gitchat";

/// Project config file name, relative to the working tree.
pub const PROJECT_CONFIG_FILE: &str = ".gitchat/config.toml";

/// SQLite database file name.
pub const STATE_DB_FILE: &str = "chat.db";

/// Current schema version for SQLite tables.
pub const SCHEMA_VERSION: u32 = 2;

/// Default page size for `list`.
pub const DEFAULT_LIMIT: u32 = 50;

/// Integration branch all sync operations target.
pub const DEFAULT_BRANCH: &str = "main";

/// Remote name the working tree is bound to.
pub const DEFAULT_REMOTE: &str = "origin";

/// Subdirectory of the working tree owned by the sync engine.
pub const MESSAGES_DIR: &str = "messages";

/// Marker that keeps an empty `messages/` directory trackable.
pub const PLACEHOLDER_FILE: &str = ".gitkeep";

pub const MESSAGE_FILE_PREFIX: &str = "message_";
pub const MESSAGE_FILE_SUFFIX: &str = ".json";

/// Commit message used when the messages directory is first seeded.
pub const INIT_COMMIT_MESSAGE: &str = "Initialize messages directory";

/// Environment variable holding the hosting-service token.
pub const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// REST API root of the hosting service.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Length of a full SHA-1 commit id as printed by `git rev-parse HEAD`.
pub const COMMIT_HASH_LEN: usize = 40;

pub fn commit_message_for(id: i64) -> String {
    format!("Add message {id}")
}
