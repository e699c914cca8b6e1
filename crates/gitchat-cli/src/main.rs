mod commands;
mod coordinator;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coordinator::Coordinator;
use gitchat_core::config::Config;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gitchat",
    version,
    about = "Chat messages stored locally and mirrored to a git remote",
    long_about = "gitchat keeps messages in a local SQLite store and mirrors each one as a\n\
        JSON file under messages/ in a git working tree. Every message becomes one\n\
        commit on the integration branch, pushed to the remote.\n\n\
        Quick start:\n  \
        gitchat init --remote-url git@github.com:owner/chat.git\n  \
        gitchat post \"hello\"\n  \
        gitchat list\n  \
        gitchat pull"
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: .gitchat/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Working tree bound to the remote (default: enclosing git repository)
    #[arg(long, global = true)]
    worktree: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the working tree for syncing
    ///
    /// With --remote-url, runs `git init` and adds the remote when missing.
    /// Creates messages/ and pushes a placeholder commit the first time.
    ///
    /// Example: gitchat init --remote-url https://github.com/owner/chat.git
    Init {
        /// Remote repository URL (https://host/owner/repo or git@host:owner/repo)
        #[arg(long)]
        remote_url: Option<String>,
    },
    /// Store a message and sync it to the remote
    ///
    /// The message is saved first. If the sync fails it stays unsynced and can be
    /// completed later with `gitchat retry`.
    ///
    /// Example: gitchat post "hello"
    Post {
        /// Message text
        content: String,
    },
    /// List messages, most recent first
    ///
    /// Examples:
    ///   gitchat list
    ///   gitchat list --limit 2 --offset 1
    List {
        /// Maximum number of messages (default: [list] default_limit)
        #[arg(long)]
        limit: Option<String>,

        /// Number of messages to skip
        #[arg(long)]
        offset: Option<String>,
    },
    /// Show one message
    Get {
        /// Message id
        id: i64,
    },
    /// List messages not yet synced, oldest first
    Unsynced {
        /// Report pending files in the working tree instead of store rows
        #[arg(long)]
        worktree_only: bool,
    },
    /// Finish syncing every unsynced message
    ///
    /// Messages already committed locally are only rebased and pushed again.
    Retry,
    /// Pull the remote branch and compare its messages with the local store
    Pull,
    /// Show commits touching messages/ on the hosted remote
    History {
        /// Maximum number of commits
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Delete every message from the local store
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, level: &str) {
    let filter = if verbose { "debug" } else { level };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config.as_deref().map(Path::new);

    // `init` may target a directory that is not a repository yet.
    let worktree = match (&cli.command, &cli.worktree) {
        (_, Some(p)) => PathBuf::from(p),
        (Commands::Init { .. }, None) => std::env::current_dir()?,
        (_, None) => resolve_worktree()?,
    };
    let config =
        Config::load_with_file(Some(&worktree), config_file).map_err(gitchat_core::Error::from)?;
    init_tracing(cli.verbose, &config.logging.level);

    if let Commands::Init { remote_url } = &cli.command {
        return commands::init::run(&worktree, remote_url.as_deref(), config);
    }

    let coordinator = Coordinator::open(&worktree, config)
        .with_context(|| format!("failed to open {}", worktree.display()))?;

    match cli.command {
        // Handled before the coordinator is opened.
        Commands::Init { .. } => Ok(()),
        Commands::Post { content } => commands::messages::post(&coordinator, &content),
        Commands::List { limit, offset } => {
            commands::messages::list(&coordinator, limit.as_deref(), offset.as_deref())
        }
        Commands::Get { id } => commands::messages::get(&coordinator, id),
        Commands::Unsynced { worktree_only } => {
            commands::sync::unsynced(&coordinator, worktree_only)
        }
        Commands::Retry => commands::sync::retry(&coordinator),
        Commands::Pull => commands::sync::pull(&coordinator),
        Commands::History { limit } => commands::history::run(&coordinator, limit),
        Commands::Clear { yes } => commands::messages::clear(&coordinator, yes),
    }
}

/// The enclosing working tree of the current directory.
fn resolve_worktree() -> anyhow::Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(gitchat_vcs::discover_worktree(&cwd).map_err(gitchat_core::Error::from)?)
}

/// Errors go to stderr as JSON so scripts can branch on `kind`.
fn report(err: &anyhow::Error) {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<gitchat_core::Error>())
        .map(|e| e.kind().as_str())
        .unwrap_or("error");
    let body = serde_json::json!({
        "error": kind,
        "message": format!("{err:#}"),
    });
    eprintln!("{body}");
}
