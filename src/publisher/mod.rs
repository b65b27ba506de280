// src/publisher/mod.rs
//! Fire-and-forget publishing for scripting hosts.
//!
//! A call is parsed into an [`OutboundMessage`] on the caller's thread and
//! the send happens on a tokio task. The caller never sees broker I/O or its
//! failures; those end up in the log. [`Publisher::publish_with_handle`] and
//! [`Publisher::try_publish`] hand back a [`PublishHandle`] for callers who
//! do want to know how it went.

pub mod args;
pub mod broker;
pub mod message;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::common::errors::{PublishError, Result};
pub use args::{HeaderMap, Part, ScriptValue};
pub use broker::{ChannelFactory, PublishChannel};
pub use message::{MessageProperties, OutboundMessage};

#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn ChannelFactory>,
    runtime: Handle,
}

impl Publisher {
    pub fn new(broker: Arc<dyn ChannelFactory>, runtime: Handle) -> Self {
        Self { broker, runtime }
    }

    /// Use the runtime the caller is running in.
    pub fn from_current(broker: Arc<dyn ChannelFactory>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| PublishError::NoRuntime)?;
        Ok(Self::new(broker, runtime))
    }

    /// `publish(exchange, routing_key, parts...)`.
    ///
    /// Returns `None` without sending anything when fewer than two arguments
    /// are given, otherwise returns `self` so calls can be chained. Whether
    /// the broker accepted the message is only visible in the log.
    ///
    /// If the runtime behind the handle has already shut down the task is
    /// dropped without running; that is logged as a cancelled publish.
    pub fn publish(&self, args: Vec<ScriptValue>) -> Option<&Self> {
        self.publish_with_handle(args).map(|_| self)
    }

    /// Same as [`publish`](Self::publish) but keeps the worker's result.
    /// Dropping the handle does not cancel the send.
    pub fn publish_with_handle(&self, args: Vec<ScriptValue>) -> Option<PublishHandle> {
        match self.try_publish(args) {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!(error = %e, "Dropping publish call");
                None
            }
        }
    }

    /// Strict variant: too few arguments is an error instead of a no-op.
    pub fn try_publish(&self, args: Vec<ScriptValue>) -> Result<PublishHandle> {
        let message = OutboundMessage::from_args(args)?;
        Ok(self.dispatch(message))
    }

    fn dispatch(&self, message: OutboundMessage) -> PublishHandle {
        let publish_id = Uuid::new_v4().to_string()[..8].to_string();
        let broker = Arc::clone(&self.broker);
        let id = publish_id.clone();
        let mut pending = PendingPublish {
            publish_id: publish_id.clone(),
            exchange: message.exchange.clone(),
            routing_key: message.routing_key.clone(),
            finished: false,
        };

        let inner = self.runtime.spawn(async move {
            let exchange = message.exchange.clone();
            let routing_key = message.routing_key.clone();
            let body_len = message.body.len();

            let result = deliver(broker.as_ref(), message).await;
            pending.finished = true;
            match &result {
                Ok(()) => debug!(
                    publish_id = %id,
                    %exchange,
                    %routing_key,
                    body_len,
                    "Published message"
                ),
                Err(e) => error!(
                    publish_id = %id,
                    %exchange,
                    %routing_key,
                    error = %e,
                    "Publish failed"
                ),
            }
            result
        });

        PublishHandle { publish_id, inner }
    }
}

/// Moved into every worker task. Dropped unfinished means the task was
/// cancelled, panicked, or never ran because the runtime was gone.
struct PendingPublish {
    publish_id: String,
    exchange: String,
    routing_key: String,
    finished: bool,
}

impl Drop for PendingPublish {
    fn drop(&mut self) {
        if !self.finished {
            error!(
                publish_id = %self.publish_id,
                exchange = %self.exchange,
                routing_key = %self.routing_key,
                "Publish cancelled before completion"
            );
        }
    }
}

/// Open a channel, publish once, close the channel.
async fn deliver(broker: &dyn ChannelFactory, message: OutboundMessage) -> Result<()> {
    message.validate()?;
    let channel = broker.create_channel().await?;

    let published = channel
        .basic_publish(
            &message.exchange,
            &message.routing_key,
            message.properties.to_basic_properties(),
            &message.body,
        )
        .await;
    let closed = channel.close().await;

    match (published, closed) {
        (Err(e), Err(close_err)) => {
            warn!(error = %close_err, "Failed to close channel after failed publish");
            Err(e)
        }
        (published, closed) => published.and(closed),
    }
}

/// Completion of one publish. Resolves to the worker's result.
#[derive(Debug)]
pub struct PublishHandle {
    publish_id: String,
    inner: JoinHandle<Result<()>>,
}

impl PublishHandle {
    /// Short id that also appears in the worker's log lines.
    pub fn id(&self) -> &str {
        &self.publish_id
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the worker and return its result.
    pub async fn wait(self) -> Result<()> {
        self.await
    }
}

impl Future for PublishHandle {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = ready!(self.inner.poll_unpin(cx));
        Poll::Ready(joined.unwrap_or_else(|e| Err(PublishError::WorkerAborted(e.to_string()))))
    }
}
