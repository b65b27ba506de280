pub mod connection;
pub mod errors;

// Re-export specific items to simplify imports elsewhere
pub use connection::ConnectionManager;
pub use errors::{ConfigError, ConnectionError, PublishError};
