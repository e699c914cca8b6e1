use gitchat_core::config::Config;
use gitchat_core::error::Result;
use gitchat_core::types::{Message, MessageRecord, Pagination};
use gitchat_state::MessageStore;
use gitchat_vcs::{
    CommitFetcher, CommitInfo, GitCli, ReconcileReport, SyncEngine, VcsAdapter, reconcile,
};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct RetryFailure {
    pub id: i64,
    pub step: Option<String>,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RetryReport {
    pub synced: Vec<Message>,
    pub failed: Option<RetryFailure>,
    pub remaining: usize,
}

#[derive(Debug, Serialize)]
pub struct PullReport {
    pub messages: Vec<MessageRecord>,
    pub reconcile: ReconcileReport,
}

/// Wires the store to the sync engine. Built once per process.
pub struct Coordinator<A: VcsAdapter = GitCli> {
    config: Config,
    store: MessageStore,
    engine: SyncEngine<A>,
}

impl Coordinator<GitCli> {
    pub fn open(worktree: &Path, config: Config) -> Result<Self> {
        let engine = SyncEngine::open(worktree, &config)?;
        let store = MessageStore::open_with_config(&config.db_path(), &config.storage)?;
        Ok(Self::from_parts(config, store, engine))
    }

    /// Like [`Coordinator::open`], creating the repository and remote first if needed.
    pub fn bootstrap(worktree: &Path, remote_url: &str, config: Config) -> Result<Self> {
        let engine = SyncEngine::bootstrap(worktree, remote_url, &config)?;
        let store = MessageStore::open_with_config(&config.db_path(), &config.storage)?;
        Ok(Self::from_parts(config, store, engine))
    }
}

impl<A: VcsAdapter> Coordinator<A> {
    pub fn from_parts(config: Config, store: MessageStore, engine: SyncEngine<A>) -> Self {
        Self {
            config,
            store,
            engine,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn engine(&self) -> &SyncEngine<A> {
        &self.engine
    }

    pub fn initialize(&self) -> Result<Option<String>> {
        Ok(self.engine.initialize()?)
    }

    /// Create, sync, then record the commit. A failed sync leaves the row unsynced
    /// and returns the sync error.
    pub fn post(&self, content: &str) -> Result<Message> {
        let message = self.store.add(content)?;
        let outcome = match self.engine.sync_message(message.id, &message.content) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(id = message.id, error = %e, "message stored but not synced");
                return Err(e.into());
            }
        };
        self.store
            .update_sync_status(message.id, &outcome.commit_hash)?;
        self.store.get(message.id)
    }

    /// `limit`/`offset` arrive as raw text; a missing limit uses `[list] default_limit`.
    pub fn list(&self, limit: Option<&str>, offset: Option<&str>) -> Result<Vec<Message>> {
        let mut page = Pagination::parse(limit, offset)?;
        if limit.is_none() {
            page.limit = self.config.list.default_limit;
        }
        self.store.list(page)
    }

    pub fn get(&self, id: i64) -> Result<Message> {
        self.store.get(id)
    }

    pub fn unsynced(&self) -> Result<Vec<Message>> {
        self.store.list_unsynced()
    }

    pub fn unsynced_files(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.engine.list_unsynced()?)
    }

    /// Resume every unsynced message, oldest first. Stops at the first failure since
    /// later messages would hit the same remote.
    pub fn retry(&self) -> Result<RetryReport> {
        let pending = self.store.list_unsynced()?;
        let mut report = RetryReport::default();
        for (done, message) in pending.iter().enumerate() {
            match self.engine.resume(message.id, &message.content) {
                Ok(outcome) => {
                    self.store
                        .update_sync_status(message.id, &outcome.commit_hash)?;
                    report.synced.push(self.store.get(message.id)?);
                }
                Err(e) => {
                    warn!(id = message.id, error = %e, "retry stopped");
                    report.failed = Some(RetryFailure {
                        id: message.id,
                        step: e.step().map(str::to_string),
                        error: e.to_string(),
                    });
                    report.remaining = pending.len() - done;
                    break;
                }
            }
        }
        info!(
            synced = report.synced.len(),
            remaining = report.remaining,
            "retry finished"
        );
        Ok(report)
    }

    /// Pull and classify records against the store without writing.
    pub fn pull(&self) -> Result<PullReport> {
        let messages = self.engine.pull_messages()?;
        let reconcile = reconcile(&messages, &self.store)?;
        Ok(PullReport {
            messages,
            reconcile,
        })
    }

    /// Commits touching the messages directory on the hosted remote.
    pub fn history(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        let fetcher = CommitFetcher::from_config(&self.config)?;
        let path = self.engine.projector().relative_dir().to_string_lossy();
        Ok(fetcher.list_commits(
            self.engine.identity(),
            &self.config.repo.branch,
            Some(path.as_ref()),
            limit,
        )?)
    }

    pub fn clear(&self) -> Result<usize> {
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitchat_core::Error;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn setup() -> (TempDir, Coordinator) {
        let root = tempfile::tempdir().unwrap();
        let remote = root.path().join("remote.git");
        git(root.path(), &["init", "--bare", remote.to_str().unwrap()]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let mut config = Config::default();
        config.repo.allow_local_remote = true;
        config.storage.data_dir = root.path().join("data").to_string_lossy().into_owned();
        config.list.default_limit = 2;

        let wt = root.path().join("wt");
        let coordinator = Coordinator::bootstrap(&wt, remote.to_str().unwrap(), config).unwrap();
        git(&wt, &["config", "user.name", "test"]);
        git(&wt, &["config", "user.email", "test@example.com"]);
        git(&wt, &["config", "commit.gpgsign", "false"]);
        coordinator.initialize().unwrap();
        (root, coordinator)
    }

    #[test]
    fn post_records_commit_hash() {
        let (_root, coordinator) = setup();
        let message = coordinator.post("hello").unwrap();
        assert_eq!(message.id, 1);
        assert!(message.synced);
        assert_eq!(message.git_commit_hash.as_ref().map(String::len), Some(40));
        assert!(coordinator.unsynced().unwrap().is_empty());
    }

    #[test]
    fn post_rejects_blank_content_before_touching_git() {
        let (_root, coordinator) = setup();
        assert!(matches!(coordinator.post("  "), Err(Error::Validation(_))));
        assert_eq!(coordinator.store().count().unwrap(), 0);
        assert!(coordinator.unsynced_files().unwrap().is_empty());
    }

    #[test]
    fn list_uses_configured_default_limit_and_validates_input() {
        let (_root, coordinator) = setup();
        for content in ["a", "b", "c"] {
            coordinator.store().create(content).unwrap();
        }
        assert_eq!(coordinator.list(None, None).unwrap().len(), 2);
        assert_eq!(coordinator.list(Some("10"), None).unwrap().len(), 3);
        assert!(matches!(
            coordinator.list(Some("abc"), None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn retry_syncs_rows_left_unsynced() {
        let (_root, coordinator) = setup();
        let id = coordinator.store().create("offline").unwrap();

        let report = coordinator.retry().unwrap();
        assert_eq!(report.synced.len(), 1);
        assert_eq!(report.synced[0].id, id);
        assert!(report.failed.is_none());
        assert!(coordinator.get(id).unwrap().synced);
    }

    #[test]
    fn pull_reports_known_records() {
        let (_root, coordinator) = setup();
        coordinator.post("hello").unwrap();
        let report = coordinator.pull().unwrap();
        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.reconcile.known, 1);
    }
}
