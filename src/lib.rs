//! Publish AMQP messages from a scripting host without waiting on the broker.
//!
//! ```no_run
//! use rabbit_dsl::{ConnectionManager, Publisher, ScriptValue, Settings};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::load()?;
//! let mut manager = ConnectionManager::new(&settings.connection);
//! let publisher = Publisher::from_current(manager.connect().await?)?;
//!
//! publisher.publish(vec![
//!     "events".into(),
//!     "user.created".into(),
//!     ScriptValue::map([("contentType", "text/plain".into())]),
//!     "hello".into(),
//! ]);
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod config;
pub mod publisher;
pub mod telemetry;

pub use common::{ConfigError, ConnectionError, ConnectionManager, PublishError};
pub use config::Settings;
pub use publisher::{
    HeaderMap, MessageProperties, OutboundMessage, Part, PublishHandle, Publisher, ScriptValue,
};
