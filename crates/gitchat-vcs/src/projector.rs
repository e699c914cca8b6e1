use gitchat_core::constants::{MESSAGE_FILE_PREFIX, MESSAGE_FILE_SUFFIX, PLACEHOLDER_FILE};
use gitchat_core::error::{ParseError, SyncError};
use gitchat_core::time::{filename_safe, now_iso8601};
use gitchat_core::types::MessageRecord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes messages as standalone JSON files under `<worktree>/<messages_dir>`.
///
/// Projection is a pure filesystem operation. Staging, committing and pushing
/// belong to the sync engine.
#[derive(Debug, Clone)]
pub struct FileProjector {
    worktree: PathBuf,
    relative_dir: PathBuf,
}

impl FileProjector {
    pub fn new(worktree: impl Into<PathBuf>, messages_dir: impl Into<PathBuf>) -> Self {
        Self {
            worktree: worktree.into(),
            relative_dir: messages_dir.into(),
        }
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    /// Messages directory relative to the worktree root, as git sees it.
    pub fn relative_dir(&self) -> &Path {
        &self.relative_dir
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.worktree.join(&self.relative_dir)
    }

    /// Create the messages directory and, when it holds no files, seed a placeholder
    /// so git can track it. Returns the placeholder path only if it was just written.
    pub fn ensure_trackable(&self) -> Result<Option<PathBuf>, SyncError> {
        let dir = self.messages_dir();
        std::fs::create_dir_all(&dir)?;
        if std::fs::read_dir(&dir)?.next().is_some() {
            return Ok(None);
        }
        let placeholder = dir.join(PLACEHOLDER_FILE);
        std::fs::write(&placeholder, b"")?;
        debug!(path = %placeholder.display(), "seeded messages directory");
        Ok(Some(placeholder))
    }

    /// Write `{id, content, timestamp}` for a message created now.
    pub fn project(&self, id: i64, content: &str) -> Result<PathBuf, SyncError> {
        self.project_at(id, content, &now_iso8601())
    }

    pub fn project_at(&self, id: i64, content: &str, timestamp: &str) -> Result<PathBuf, SyncError> {
        let dir = self.messages_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file_name(id, timestamp));
        let record = MessageRecord {
            id,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        debug!(id, path = %path.display(), "message projected");
        Ok(path)
    }

    /// Strip the worktree prefix so the path can be handed to git.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.worktree)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Every projected file whose name carries `id`, oldest first.
    pub fn files_for(&self, id: i64) -> Result<Vec<PathBuf>, SyncError> {
        let mut files: Vec<(String, PathBuf)> = self
            .message_files()?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let (file_id, stamp) = parse_file_name(name).ok()?;
                (file_id == id).then(|| (stamp, path.clone()))
            })
            .collect();
        files.sort();
        Ok(files.into_iter().map(|(_, path)| path).collect())
    }

    /// Parse every projected file. Unparsable files are skipped.
    pub fn scan(&self) -> Result<Vec<MessageRecord>, SyncError> {
        let files = self.message_files()?;
        Ok(parse_all(&files))
    }

    fn message_files(&self) -> Result<Vec<PathBuf>, SyncError> {
        let dir = self.messages_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(is_message_file_name)
            {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

/// `message_<id>_<timestamp with ':' replaced by '-'>.json`
pub fn file_name(id: i64, timestamp: &str) -> String {
    format!(
        "{MESSAGE_FILE_PREFIX}{id}_{}{MESSAGE_FILE_SUFFIX}",
        filename_safe(timestamp)
    )
}

pub fn is_message_file_name(name: &str) -> bool {
    name.starts_with(MESSAGE_FILE_PREFIX) && name.ends_with(MESSAGE_FILE_SUFFIX)
}

/// Inverse of [`file_name`]: the id and the filename-safe timestamp.
pub fn parse_file_name(name: &str) -> Result<(i64, String), ParseError> {
    let unexpected = || ParseError::UnexpectedFileName {
        name: name.to_string(),
    };
    let stem = name
        .strip_prefix(MESSAGE_FILE_PREFIX)
        .and_then(|s| s.strip_suffix(MESSAGE_FILE_SUFFIX))
        .ok_or_else(unexpected)?;
    let (id, stamp) = stem.split_once('_').ok_or_else(unexpected)?;
    let id = id.parse::<i64>().map_err(|_| unexpected())?;
    if stamp.is_empty() {
        return Err(unexpected());
    }
    Ok((id, stamp.to_string()))
}

pub fn parse(path: &Path) -> Result<MessageRecord, ParseError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| ParseError::Json {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Parse `paths`, logging and skipping failures, ordered by embedded timestamp.
pub fn parse_all(paths: &[PathBuf]) -> Vec<MessageRecord> {
    let mut records: Vec<MessageRecord> = paths
        .iter()
        .filter_map(|path| match parse(path) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unparsable message file");
                None
            }
        })
        .collect();
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
    records
}
