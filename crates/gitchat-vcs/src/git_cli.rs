use crate::adapter::VcsAdapter;
use crate::status::{StatusEntry, parse_porcelain};
use gitchat_core::error::SyncError;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, warn};

/// [`VcsAdapter`] backed by the `git` executable.
///
/// Each call blocks until the child process exits. Prompts are disabled so a missing
/// credential fails the step instead of waiting on a terminal.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn exec(&self, worktree: &Path, step: &str, args: &[&str]) -> Result<Output, SyncError> {
        debug!(step, ?args, worktree = %worktree.display(), "running git");
        Command::new(&self.program)
            .args(args)
            .current_dir(worktree)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SyncError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    /// Run one git command and return its stdout.
    pub fn run(&self, worktree: &Path, step: &str, args: &[&str]) -> Result<String, SyncError> {
        let output = self.exec(worktree, step, args)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }
        let err = command_failed(step, args, &output);
        if let SyncError::CommandFailed { status, stderr, .. } = &err {
            warn!(step, status, diagnostic = %stderr, "git command failed");
        }
        Err(err)
    }

    fn run_path(
        &self,
        worktree: &Path,
        step: &str,
        args: &[&str],
        path: &Path,
    ) -> Result<String, SyncError> {
        let path = path.to_string_lossy();
        let mut full: Vec<&str> = args.to_vec();
        full.push(path.as_ref());
        self.run(worktree, step, &full)
    }
}

fn command_failed(step: &str, args: &[&str], output: &Output) -> SyncError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    // `commit` reports "nothing to commit" on stdout.
    let diagnostic = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    SyncError::CommandFailed {
        step: step.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        status: output.status.code().unwrap_or(-1),
        stderr: diagnostic,
    }
}

impl VcsAdapter for GitCli {
    fn detect_repo(&self, worktree: &Path) -> Result<PathBuf, SyncError> {
        if !worktree.is_dir() {
            return Err(SyncError::NotARepository {
                path: worktree.display().to_string(),
            });
        }
        match self.run(worktree, "rev-parse", &["rev-parse", "--show-toplevel"]) {
            Ok(out) if !out.trim().is_empty() => Ok(PathBuf::from(out.trim())),
            Ok(_) => Err(SyncError::NotARepository {
                path: worktree.display().to_string(),
            }),
            Err(SyncError::CommandFailed { .. }) => Err(SyncError::NotARepository {
                path: worktree.display().to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn init(&self, worktree: &Path, branch: &str) -> Result<(), SyncError> {
        std::fs::create_dir_all(worktree)?;
        self.run(worktree, "init", &["init"])?;
        let head = format!("refs/heads/{branch}");
        self.run(worktree, "init", &["symbolic-ref", "HEAD", &head])?;
        Ok(())
    }

    fn remote_url(&self, worktree: &Path, remote: &str) -> Result<String, SyncError> {
        let out = self.run(worktree, "remote", &["remote", "get-url", remote])?;
        Ok(out.trim().to_string())
    }

    fn add_remote(&self, worktree: &Path, remote: &str, url: &str) -> Result<(), SyncError> {
        self.run(worktree, "remote", &["remote", "add", remote, url])?;
        Ok(())
    }

    fn remote_has_branch(
        &self,
        worktree: &Path,
        remote: &str,
        branch: &str,
    ) -> Result<bool, SyncError> {
        let out = self.run(worktree, "ls-remote", &["ls-remote", "--heads", remote, branch])?;
        let wanted = format!("refs/heads/{branch}");
        Ok(out
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(wanted.as_str())))
    }

    fn add_force(&self, worktree: &Path, path: &Path) -> Result<(), SyncError> {
        self.run_path(worktree, "add", &["add", "-f", "--"], path)?;
        Ok(())
    }

    fn commit(&self, worktree: &Path, message: &str) -> Result<(), SyncError> {
        self.run(worktree, "commit", &["commit", "-m", message])?;
        Ok(())
    }

    fn pull_rebase(&self, worktree: &Path, remote: &str, branch: &str) -> Result<(), SyncError> {
        self.run(worktree, "pull --rebase", &["pull", "--rebase", remote, branch])?;
        Ok(())
    }

    fn pull_merge(&self, worktree: &Path, remote: &str, branch: &str) -> Result<(), SyncError> {
        self.run(worktree, "pull", &["pull", "--no-rebase", "--no-edit", remote, branch])?;
        Ok(())
    }

    fn push(
        &self,
        worktree: &Path,
        remote: &str,
        branch: &str,
        set_upstream: bool,
    ) -> Result<(), SyncError> {
        if set_upstream {
            self.run(worktree, "push", &["push", "-u", remote, branch])?;
        } else {
            self.run(worktree, "push", &["push", remote, branch])?;
        }
        Ok(())
    }

    fn resolve_head(&self, worktree: &Path) -> Result<String, SyncError> {
        let out = self.run(worktree, "rev-parse HEAD", &["rev-parse", "HEAD"])?;
        let hash = out.trim();
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SyncError::UnexpectedOutput {
                step: "rev-parse HEAD".into(),
                output: out,
            });
        }
        Ok(hash.to_string())
    }

    fn status(&self, worktree: &Path, pathspec: &Path) -> Result<Vec<StatusEntry>, SyncError> {
        let out = self.run_path(
            worktree,
            "status",
            &["status", "--porcelain", "--untracked-files=all", "--"],
            pathspec,
        )?;
        Ok(parse_porcelain(&out))
    }

    fn last_commit_touching(
        &self,
        worktree: &Path,
        path: &Path,
    ) -> Result<Option<String>, SyncError> {
        let out = self.run_path(worktree, "log", &["log", "-n1", "--format=%H", "--"], path)?;
        let hash = out.trim();
        Ok((!hash.is_empty()).then(|| hash.to_string()))
    }

    fn is_pushed(
        &self,
        worktree: &Path,
        commit: &str,
        remote: &str,
        branch: &str,
    ) -> Result<bool, SyncError> {
        let tip = format!("{remote}/{branch}");
        let args = ["merge-base", "--is-ancestor", commit, tip.as_str()];
        let output = self.exec(worktree, "merge-base", &args)?;
        // Exit 1 means "not an ancestor"; anything else non-zero is a real failure.
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed("merge-base", &args, &output)),
        }
    }
}
