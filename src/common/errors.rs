// src/common/errors.rs

use lapin::Error as LapinError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between parsing a publish call and closing
/// the channel it used. None of these reach the caller of
/// [`Publisher::publish`](crate::Publisher::publish); the worker logs them.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("publish needs an exchange and a routing key, got {given} argument(s)")]
    InsufficientArguments { given: usize },

    #[error("{field} is {len} bytes, AMQP short strings hold at most 255")]
    ShortStringTooLong { field: String, len: usize },

    #[error("no tokio runtime available to run publish workers")]
    NoRuntime,

    #[error("Failed to open channel: {0}")]
    ChannelOpen(#[source] LapinError),

    #[error("Failed to publish message: {0}")]
    Publish(#[source] LapinError),

    #[error("Failed to close channel: {0}")]
    ChannelClose(#[source] LapinError),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Publish worker did not finish: {0}")]
    WorkerAborted(String),
}

impl From<&str> for PublishError {
    fn from(message: &str) -> Self {
        PublishError::Broker(message.to_string())
    }
}

impl From<String> for PublishError {
    fn from(message: String) -> Self {
        PublishError::Broker(message)
    }
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to RabbitMQ after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: LapinError,
    },

    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to close connection: {0}")]
    Close(#[source] LapinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file contains invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

pub type Result<T, E = PublishError> = std::result::Result<T, E>;
