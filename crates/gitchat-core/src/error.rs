use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl Error {
    /// Stable machine-readable kind, used by the CLI when reporting failures as JSON.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::State(StateError::NotFound { .. }) => ErrorKind::NotFound,
            Self::State(_) => ErrorKind::Internal,
            Self::Sync(_) => ErrorKind::Sync,
            Self::Parse(_) => ErrorKind::Parse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Validation,
    NotFound,
    Sync,
    Parse,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Sync => "sync_error",
            Self::Parse => "parse_error",
            Self::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config value: {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("missing credential: environment variable {env_var} is not set")]
    MissingCredential { env_var: String },

    #[error("could not parse remote url `{url}`: {reason}")]
    UnparsableRemote { url: String, reason: String },

    #[error("no git repository found at or above {path}")]
    NoRepositoryRoot { path: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn unparsable_remote(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnparsableRemote {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("message content must not be empty")]
    EmptyContent,

    #[error("invalid argument {field}={value:?}: {reason}")]
    InvalidArgument {
        field: String,
        value: String,
        reason: String,
    },
}

impl ValidationError {
    pub fn invalid_argument(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("message not found: {id}")]
    NotFound { id: i64 },

    #[error("schema migration required: current={current}, required={required}")]
    SchemaMigrationRequired { current: u32, required: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    /// For use with `.map_err(StateError::sqlite)`.
    pub fn sqlite<E: std::fmt::Display>(e: E) -> Self {
        Self::Sqlite(e.to_string())
    }

    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }
}

/// Failure of one external version-control step.
///
/// `stderr` is the tool's own diagnostic, passed through untouched.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("git {step} failed (exit {status}): {stderr}")]
    CommandFailed {
        step: String,
        args: Vec<String>,
        status: i32,
        stderr: String,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a git repository: {path}")]
    NotARepository { path: String },

    #[error("unexpected git output for {step}: {output:?}")]
    UnexpectedOutput { step: String, output: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn http<E: std::fmt::Display>(e: E) -> Self {
        Self::Http(e.to_string())
    }

    /// The git step that failed, if this error came from a git invocation.
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { step, .. } | Self::UnexpectedOutput { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Malformed projected file. Absorbed by enumeration and only surfaced by direct `parse` calls.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid message json in {path}: {reason}")]
    Json { path: String, reason: String },

    #[error("not a message file name: {name}")]
    UnexpectedFileName { name: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
