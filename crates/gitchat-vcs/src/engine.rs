use crate::adapter::VcsAdapter;
use crate::git_cli::GitCli;
use crate::projector::{self, FileProjector};
use crate::remote::RemoteIdentity;
use gitchat_core::config::Config;
use gitchat_core::constants::{INIT_COMMIT_MESSAGE, commit_message_for};
use gitchat_core::error::{self, ConfigError, Error, SyncError};
use gitchat_core::types::MessageRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Progress of one message through `commit_and_push`.
///
/// Stages only move forward. A failure leaves the message at the last stage reached;
/// nothing already done is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStage {
    Projected,
    Staged,
    Committed,
    Rebased,
    Pushed,
}

impl SyncStage {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Projected => Some(Self::Staged),
            Self::Staged => Some(Self::Committed),
            Self::Committed => Some(Self::Rebased),
            Self::Rebased => Some(Self::Pushed),
            Self::Pushed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Projected => "projected",
            Self::Staged => "staged",
            Self::Committed => "committed",
            Self::Rebased => "rebased",
            Self::Pushed => "pushed",
        }
    }
}

/// Where a projected file stands relative to local history and the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    LocalUncommitted,
    CommittedLocal,
    Pushed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub commit_hash: String,
    pub file: PathBuf,
}

/// Drives message files through git: stage, commit, rebase, push.
///
/// Bound to one working tree. Callers must not run two syncs against the same
/// working tree at once; the index is shared and no lock is taken here.
pub struct SyncEngine<A: VcsAdapter = GitCli> {
    adapter: A,
    projector: FileProjector,
    remote: String,
    branch: String,
    identity: RemoteIdentity,
}

impl SyncEngine<GitCli> {
    /// Bind to an existing working copy that already has the configured remote.
    pub fn open(worktree: &Path, config: &Config) -> error::Result<Self> {
        Self::with_adapter(GitCli::new(config.repo.git_bin.as_str()), worktree, config)
    }

    /// `git init` + `git remote add` when needed, then [`SyncEngine::open`].
    pub fn bootstrap(worktree: &Path, url: &str, config: &Config) -> error::Result<Self> {
        Self::bootstrap_with_adapter(
            GitCli::new(config.repo.git_bin.as_str()),
            worktree,
            url,
            config,
        )
    }
}

impl<A: VcsAdapter> SyncEngine<A> {
    /// Bind to the working tree containing `worktree`. A subdirectory binds to the
    /// repository root, since status paths are reported relative to it.
    pub fn with_adapter(adapter: A, worktree: &Path, config: &Config) -> error::Result<Self> {
        let root = adapter.detect_repo(worktree).map_err(|e| match e {
            SyncError::NotARepository { path } => Error::from(ConfigError::NoRepositoryRoot { path }),
            other => other.into(),
        })?;
        let root = bound_root(worktree, root);
        let worktree = root.as_path();

        let remote = config.repo.remote.clone();
        let url = adapter.remote_url(worktree, &remote).map_err(|e| match e {
            SyncError::CommandFailed { stderr, .. } => Error::from(ConfigError::InvalidValue {
                field: "repo.remote".into(),
                reason: format!("remote `{remote}` is not configured: {stderr}"),
            }),
            other => other.into(),
        })?;
        let identity = RemoteIdentity::parse(&url, config.repo.allow_local_remote)?;
        config.token()?;

        info!(
            worktree = %worktree.display(),
            remote = %identity,
            branch = %config.repo.branch,
            "sync engine bound"
        );
        Ok(Self {
            adapter,
            projector: FileProjector::new(worktree, config.repo.messages_dir.as_str()),
            remote,
            branch: config.repo.branch.clone(),
            identity,
        })
    }

    pub fn bootstrap_with_adapter(
        adapter: A,
        worktree: &Path,
        url: &str,
        config: &Config,
    ) -> error::Result<Self> {
        // Reject a bad URL before touching the directory.
        RemoteIdentity::parse(url, config.repo.allow_local_remote)?;

        match adapter.detect_repo(worktree) {
            Ok(_) => {}
            Err(SyncError::NotARepository { .. }) => {
                info!(worktree = %worktree.display(), "initializing repository");
                adapter.init(worktree, &config.repo.branch)?;
            }
            Err(e) => return Err(e.into()),
        }

        match adapter.remote_url(worktree, &config.repo.remote) {
            Ok(existing) if existing == url => {}
            Ok(existing) => {
                warn!(remote = %config.repo.remote, %existing, requested = url, "remote already set; keeping it");
            }
            Err(SyncError::CommandFailed { .. }) => {
                adapter.add_remote(worktree, &config.repo.remote, url)?;
            }
            Err(e) => return Err(e.into()),
        }

        Self::with_adapter(adapter, worktree, config)
    }

    pub fn identity(&self) -> &RemoteIdentity {
        &self.identity
    }

    pub fn projector(&self) -> &FileProjector {
        &self.projector
    }

    pub fn worktree(&self) -> &Path {
        self.projector.worktree()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// One-time repository preparation, run before the first message is synced.
    ///
    /// Catches up with the remote branch if it exists, then makes the messages
    /// directory trackable. A freshly seeded placeholder is committed and pushed with
    /// upstream tracking; its commit hash is returned.
    pub fn initialize(&self) -> Result<Option<String>, SyncError> {
        let wt = self.worktree();
        if self.adapter.remote_has_branch(wt, &self.remote, &self.branch)? {
            self.adapter.pull_rebase(wt, &self.remote, &self.branch)?;
        }

        let Some(placeholder) = self.projector.ensure_trackable()? else {
            debug!("messages directory already trackable");
            return Ok(None);
        };
        self.adapter.add_force(wt, &self.projector.relative(&placeholder))?;
        self.adapter.commit(wt, INIT_COMMIT_MESSAGE)?;
        self.adapter.push(wt, &self.remote, &self.branch, true)?;
        let hash = self.adapter.resolve_head(wt)?;
        info!(commit = %hash, "messages directory initialized");
        Ok(Some(hash))
    }

    /// Project the message and run it through every stage.
    pub fn sync_message(&self, id: i64, content: &str) -> Result<SyncOutcome, SyncError> {
        let file = self.projector.project(id, content)?;
        let commit_hash = self.commit_and_push(&file, id)?;
        Ok(SyncOutcome { commit_hash, file })
    }

    /// add -f, commit, pull --rebase, push, then read back HEAD.
    pub fn commit_and_push(&self, file: &Path, id: i64) -> Result<String, SyncError> {
        let rel = self.projector.relative(file);
        self.advance(SyncStage::Projected, &rel, id)?;
        let hash = self.adapter.resolve_head(self.worktree())?;
        info!(id, commit = %hash, "message synced");
        Ok(hash)
    }

    /// Finish an interrupted sync without repeating completed work.
    ///
    /// A file still pending in the working tree restarts at staging. A file that was
    /// committed but never pushed is only rebased and pushed. A matching file already
    /// on the remote is never adopted: ids are assigned per working tree, so it may be
    /// another tree's message. Without an unpushed projection the full sync runs.
    pub fn resume(&self, id: i64, content: &str) -> Result<SyncOutcome, SyncError> {
        for file in self.find_projections(id, content)?.into_iter().rev() {
            let rel = self.projector.relative(&file);
            let commit_hash = match self.message_state(&rel)? {
                MessageState::LocalUncommitted => {
                    self.advance(SyncStage::Projected, &rel, id)?;
                    self.adapter.resolve_head(self.worktree())?
                }
                MessageState::CommittedLocal => {
                    self.advance(SyncStage::Committed, &rel, id)?;
                    self.commit_of(&rel)?
                }
                MessageState::Pushed => {
                    debug!(id, file = %rel.display(), "matching file already on the remote; skipping");
                    continue;
                }
            };
            info!(id, commit = %commit_hash, "message sync resumed");
            return Ok(SyncOutcome { commit_hash, file });
        }
        debug!(id, "no unpushed projection; running full sync");
        self.sync_message(id, content)
    }

    /// Classify a projected file, given relative to the worktree root.
    pub fn message_state(&self, rel: &Path) -> Result<MessageState, SyncError> {
        let wt = self.worktree();
        let pending = self
            .adapter
            .status(wt, rel)?
            .iter()
            .any(|entry| entry.is_pending());
        if pending {
            return Ok(MessageState::LocalUncommitted);
        }
        let Some(commit) = self.adapter.last_commit_touching(wt, rel)? else {
            return Ok(MessageState::LocalUncommitted);
        };
        match self.adapter.is_pushed(wt, &commit, &self.remote, &self.branch) {
            Ok(true) => Ok(MessageState::Pushed),
            Ok(false) => Ok(MessageState::CommittedLocal),
            // No remote-tracking ref yet: nothing was ever pushed.
            Err(SyncError::CommandFailed { .. }) => Ok(MessageState::CommittedLocal),
            Err(e) => Err(e),
        }
    }

    /// Fetch and merge the remote branch, then parse every projected file.
    pub fn pull_messages(&self) -> Result<Vec<MessageRecord>, SyncError> {
        self.adapter
            .pull_merge(self.worktree(), &self.remote, &self.branch)?;
        let records = self.projector.scan()?;
        info!(count = records.len(), "messages pulled");
        Ok(records)
    }

    /// Projected files that are untracked, added or modified, oldest first.
    pub fn list_unsynced(&self) -> Result<Vec<MessageRecord>, SyncError> {
        let rel_dir = self.projector.relative_dir();
        if !self.projector.messages_dir().is_dir() {
            return Ok(Vec::new());
        }
        let paths: Vec<PathBuf> = self
            .adapter
            .status(self.worktree(), rel_dir)?
            .into_iter()
            .filter(|entry| entry.is_pending())
            .map(|entry| PathBuf::from(entry.path))
            .filter(|path| {
                path.starts_with(rel_dir)
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(projector::is_message_file_name)
            })
            .map(|path| self.worktree().join(path))
            .collect();
        Ok(projector::parse_all(&paths))
    }

    fn advance(&self, from: SyncStage, rel: &Path, id: i64) -> Result<(), SyncError> {
        let wt = self.worktree();
        let mut stage = from;
        while let Some(next) = stage.next() {
            match next {
                SyncStage::Projected => {}
                SyncStage::Staged => self.adapter.add_force(wt, rel)?,
                SyncStage::Committed => self.adapter.commit(wt, &commit_message_for(id))?,
                SyncStage::Rebased => self.adapter.pull_rebase(wt, &self.remote, &self.branch)?,
                SyncStage::Pushed => self.adapter.push(wt, &self.remote, &self.branch, false)?,
            }
            debug!(id, stage = next.as_str(), "sync stage reached");
            stage = next;
        }
        Ok(())
    }

    fn commit_of(&self, rel: &Path) -> Result<String, SyncError> {
        self.adapter
            .last_commit_touching(self.worktree(), rel)?
            .ok_or_else(|| SyncError::UnexpectedOutput {
                step: "log".into(),
                output: format!("no commit touches {}", rel.display()),
            })
    }

    /// Projected files for `id` whose content matches, oldest first.
    fn find_projections(&self, id: i64, content: &str) -> Result<Vec<PathBuf>, SyncError> {
        let mut matching = Vec::new();
        for path in self.projector.files_for(id)? {
            match projector::parse(&path) {
                Ok(record) if record.id == id && record.content == content => {
                    matching.push(path);
                }
                Ok(_) => {}
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unparsable message file"),
            }
        }
        Ok(matching)
    }
}

/// Keep the caller's spelling of the path when it already is the root.
fn bound_root(worktree: &Path, root: PathBuf) -> PathBuf {
    match (worktree.canonicalize(), root.canonicalize()) {
        (Ok(given), Ok(top)) if given == top => worktree.to_path_buf(),
        _ => {
            debug!(given = %worktree.display(), root = %root.display(), "binding to repository root");
            root
        }
    }
}
