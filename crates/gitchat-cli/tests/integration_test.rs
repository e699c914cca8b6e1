//! Drives the `gitchat` binary against a local bare remote.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
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

struct Env {
    root: TempDir,
    remote: PathBuf,
    worktree: PathBuf,
}

impl Env {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let remote = root.path().join("remote.git");
        git(root.path(), &["init", "--bare", remote.to_str().unwrap()]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        let worktree = root.path().join("wt");
        Self {
            root,
            remote,
            worktree,
        }
    }

    fn gitchat(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_gitchat"))
            .arg("--worktree")
            .arg(&self.worktree)
            .args(args)
            .env("HOME", self.root.path())
            .env(
                "GITCHAT_STORAGE_DATA_DIR",
                self.root.path().join("data"),
            )
            .env("GITCHAT_REPO_ALLOW_LOCAL_REMOTE", "true")
            .env("RUST_LOG", "off")
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .output()
            .unwrap()
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.gitchat(args);
        assert!(
            output.status.success(),
            "gitchat {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn init(&self) -> Value {
        self.json(&["init", "--remote-url", self.remote.to_str().unwrap()])
    }
}

#[test]
fn init_post_list_get() {
    let env = Env::new();
    let init = env.init();
    assert_eq!(init["initialized"], true);
    // Local remotes have no hosted clone url.
    assert!(init["clone_url"].is_null());

    let posted = env.json(&["post", "hello"]);
    assert_eq!(posted["id"], 1);
    assert_eq!(posted["synced"], true);
    assert_eq!(posted["git_commit_hash"].as_str().unwrap().len(), 40);

    env.json(&["post", "second"]);
    let listed = env.json(&["list", "--limit", "1"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["content"], "second");

    let got = env.json(&["get", "1"]);
    assert_eq!(got["content"], "hello");

    let unsynced = env.json(&["unsynced"]);
    assert!(unsynced.as_array().unwrap().is_empty());
}

#[test]
fn second_init_is_a_no_op() {
    let env = Env::new();
    env.init();
    let again = env.init();
    assert_eq!(again["initialized"], false);
}

#[test]
fn errors_are_reported_with_kind() {
    let env = Env::new();
    env.init();

    let output = env.gitchat(&["get", "999999"]);
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"], "not_found");

    let output = env.gitchat(&["list", "--limit", "abc"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("validation_error"));
}

#[test]
fn clear_requires_confirmation() {
    let env = Env::new();
    env.init();
    env.json(&["post", "hello"]);

    assert!(!env.gitchat(&["clear"]).status.success());
    let cleared = env.json(&["clear", "--yes"]);
    assert_eq!(cleared["removed"], 1);
}

#[test]
fn pull_reports_reconciliation() {
    let env = Env::new();
    env.init();
    env.json(&["post", "hello"]);

    let pulled = env.json(&["pull"]);
    assert_eq!(pulled["messages"].as_array().unwrap().len(), 1);
    assert_eq!(pulled["reconcile"]["known"], 1);
}
