pub mod config;
pub mod constants;
pub mod error;
pub mod time;
pub mod types;

pub use error::{ConfigError, Error, ParseError, StateError, SyncError, ValidationError};
pub use types::{Message, MessageRecord, Pagination};
