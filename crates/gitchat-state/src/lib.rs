pub mod db;
pub mod messages;
pub mod schema;

pub use messages::MessageStore;
