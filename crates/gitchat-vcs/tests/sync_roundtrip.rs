//! End-to-end sync against a local bare remote with the real `git` binary.

use gitchat_core::config::Config;
use gitchat_core::constants::COMMIT_HASH_LEN;
use gitchat_state::MessageStore;
use gitchat_vcs::{MessageState, SyncEngine, VcsAdapter};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
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
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure_identity(worktree: &Path, name: &str) {
    git(worktree, &["config", "user.name", name]);
    git(worktree, &["config", "user.email", &format!("{name}@example.com")]);
    git(worktree, &["config", "commit.gpgsign", "false"]);
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.repo.allow_local_remote = true;
    config
}

struct Fixture {
    root: TempDir,
    remote: PathBuf,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let remote = root.path().join("remote.git");
        git(root.path(), &["init", "--bare", remote.to_str().unwrap()]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        Self {
            root,
            remote,
            config: test_config(),
        }
    }

    fn remote_url(&self) -> &str {
        self.remote.to_str().unwrap()
    }

    /// First working tree: bootstrapped from an empty directory and initialized.
    fn primary(&self) -> SyncEngine {
        let wt = self.root.path().join("alice");
        std::fs::create_dir_all(&wt).unwrap();
        let engine = SyncEngine::bootstrap(&wt, self.remote_url(), &self.config).unwrap();
        configure_identity(&wt, "alice");
        engine.initialize().unwrap();
        engine
    }

    /// Second working tree cloned from the remote.
    fn secondary(&self) -> SyncEngine {
        let wt = self.root.path().join("bob");
        git(
            self.root.path(),
            &["clone", self.remote_url(), wt.to_str().unwrap()],
        );
        configure_identity(&wt, "bob");
        SyncEngine::open(&wt, &self.config).unwrap()
    }

    fn remote_head(&self) -> String {
        git(&self.remote, &["rev-parse", "main"])
    }

    fn store(&self, name: &str) -> MessageStore {
        MessageStore::open(&self.root.path().join(format!("{name}.db"))).unwrap()
    }
}

#[test]
fn message_reaches_second_worktree() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let bob = fx.secondary();
    let store = fx.store("alice");

    let id = store.create("hello").unwrap();
    assert_eq!(id, 1);
    assert!(!store.get(id).unwrap().synced);

    let outcome = alice.sync_message(id, "hello").unwrap();
    assert_eq!(outcome.commit_hash.len(), COMMIT_HASH_LEN);
    assert_eq!(outcome.commit_hash, fx.remote_head());
    store.update_sync_status(id, &outcome.commit_hash).unwrap();

    let row = store.get(id).unwrap();
    assert!(row.synced);
    assert_eq!(row.git_commit_hash.as_deref(), Some(outcome.commit_hash.as_str()));

    let pulled = bob.pull_messages().unwrap();
    assert!(
        pulled
            .iter()
            .any(|r| r.id == 1 && r.content == "hello")
    );
    assert_eq!(
        git(bob.worktree(), &["log", "-1", "--format=%s"]),
        "Add message 1"
    );
}

#[test]
fn initialize_is_one_time() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let first = fx.remote_head();

    assert_eq!(alice.initialize().unwrap(), None);
    assert_eq!(fx.remote_head(), first);
    assert_eq!(
        git(alice.worktree(), &["log", "-1", "--format=%s"]),
        "Initialize messages directory"
    );
}

#[test]
fn unsynced_until_pushed() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let store = fx.store("alice");

    let id = store.create("x").unwrap();
    let file = alice.projector().project(id, "x").unwrap();

    let unsynced = alice.list_unsynced().unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].content, "x");
    assert_eq!(store.list_unsynced().unwrap().len(), 1);

    let hash = alice.commit_and_push(&file, id).unwrap();
    store.update_sync_status(id, &hash).unwrap();

    assert!(alice.list_unsynced().unwrap().is_empty());
    assert!(store.list_unsynced().unwrap().is_empty());
}

#[test]
fn ignored_message_files_are_still_committed() {
    let fx = Fixture::new();
    let alice = fx.primary();
    std::fs::write(alice.worktree().join(".gitignore"), "messages/*.json\n").unwrap();

    let outcome = alice.sync_message(1, "ignored").unwrap();
    let tracked = git(alice.worktree(), &["ls-files", "messages"]);
    let name = outcome.file.file_name().unwrap().to_str().unwrap();
    assert!(tracked.contains(name));
}

#[cfg(unix)]
#[test]
fn failed_push_is_resumed_without_recommitting() {
    use std::os::unix::fs::PermissionsExt;

    let fx = Fixture::new();
    let alice = fx.primary();
    let before = fx.remote_head();

    let hook = alice.worktree().join(".git/hooks/pre-push");
    std::fs::write(&hook, "#!/bin/sh\necho 'push blocked' >&2\nexit 1\n").unwrap();
    std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();

    let err = alice.sync_message(7, "retry me").unwrap_err();
    assert_eq!(err.step(), Some("push"));
    assert!(err.to_string().contains("push blocked"));
    assert_eq!(fx.remote_head(), before);

    let file = alice.projector().files_for(7).unwrap().remove(0);
    let rel = alice.projector().relative(&file);
    assert_eq!(
        alice.message_state(&rel).unwrap(),
        MessageState::CommittedLocal
    );
    // Committed files are not reported as unsynced by the working-tree view.
    assert!(alice.list_unsynced().unwrap().is_empty());

    std::fs::remove_file(&hook).unwrap();
    let outcome = alice.resume(7, "retry me").unwrap();
    assert_eq!(outcome.file, file);
    assert_eq!(outcome.commit_hash, fx.remote_head());
    assert_eq!(alice.message_state(&rel).unwrap(), MessageState::Pushed);

    let subjects = git(alice.worktree(), &["log", "--format=%s"]);
    assert_eq!(
        subjects.lines().filter(|s| *s == "Add message 7").count(),
        1
    );
}

#[test]
fn concurrent_remote_write_is_absorbed_by_rebase() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let bob = fx.secondary();

    let from_bob = bob.sync_message(100, "from bob").unwrap();
    assert_eq!(from_bob.commit_hash, fx.remote_head());

    // Alice has not pulled; her commit is replayed on top of Bob's.
    let from_alice = alice.sync_message(1, "from alice").unwrap();
    assert_eq!(from_alice.commit_hash, fx.remote_head());
    let parent = git(alice.worktree(), &["rev-parse", "HEAD~1"]);
    assert_eq!(parent, from_bob.commit_hash);

    let pulled = bob.pull_messages().unwrap();
    let contents: Vec<&str> = pulled.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["from bob", "from alice"]);
}

#[test]
fn resume_never_claims_another_worktrees_message() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let bob = fx.secondary();

    // Both trees assigned id 1 on their own; Bob pushed first.
    let from_bob = bob.sync_message(1, "hi").unwrap();
    let pulled = alice.pull_messages().unwrap();
    assert!(pulled.iter().any(|r| r.id == 1 && r.content == "hi"));

    let outcome = alice.resume(1, "hi").unwrap();
    assert_ne!(outcome.commit_hash, from_bob.commit_hash);
    assert_eq!(outcome.commit_hash, fx.remote_head());
    assert_ne!(outcome.file.file_name(), from_bob.file.file_name());
    assert_eq!(alice.projector().files_for(1).unwrap().len(), 2);
}

#[test]
fn subdirectory_binds_to_repository_root() {
    let fx = Fixture::new();
    let alice = fx.primary();
    let nested = alice.worktree().join("chat");
    std::fs::create_dir_all(&nested).unwrap();

    let engine = SyncEngine::open(&nested, &fx.config).unwrap();
    assert_eq!(
        engine.worktree().canonicalize().unwrap(),
        alice.worktree().canonicalize().unwrap()
    );

    engine.projector().project(1, "x").unwrap();
    let unsynced = engine.list_unsynced().unwrap();
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].content, "x");
}

#[test]
fn open_rejects_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = SyncEngine::open(dir.path(), &test_config()).err().unwrap();
    assert!(matches!(
        err,
        gitchat_core::Error::Config(gitchat_core::ConfigError::NoRepositoryRoot { .. })
    ));
}

#[test]
fn local_remote_requires_opt_in() {
    let fx = Fixture::new();
    let _alice = fx.primary();
    let wt = fx.root.path().join("alice");
    let err = SyncEngine::open(&wt, &Config::default()).err().unwrap();
    assert!(matches!(
        err,
        gitchat_core::Error::Config(gitchat_core::ConfigError::UnparsableRemote { .. })
    ));
}

#[test]
fn adapter_reports_remote_branch() {
    let fx = Fixture::new();
    let alice = fx.primary();
    assert!(
        alice
            .adapter()
            .remote_has_branch(alice.worktree(), "origin", "main")
            .unwrap()
    );
    assert!(
        !alice
            .adapter()
            .remote_has_branch(alice.worktree(), "origin", "nope")
            .unwrap()
    );
}
