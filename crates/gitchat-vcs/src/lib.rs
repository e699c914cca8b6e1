pub mod adapter;
pub mod discover;
pub mod engine;
pub mod git_cli;
pub mod history;
pub mod projector;
pub mod reconcile;
pub mod remote;
pub mod status;

pub use adapter::VcsAdapter;
pub use discover::discover_worktree;
pub use engine::{MessageState, SyncEngine, SyncOutcome, SyncStage};
pub use git_cli::GitCli;
pub use history::{CommitFetcher, CommitInfo};
pub use projector::FileProjector;
pub use reconcile::{ReconcileReport, RecordStatus, reconcile};
pub use remote::{RemoteIdentity, Transport};
pub use status::StatusEntry;
