// src/publisher/broker.rs
//! The slice of an AMQP client the publish worker needs: open a channel,
//! publish on it once, close it.

use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Connection};
use tracing::debug;

use crate::common::errors::{PublishError, Result};

/// Source of fresh channels. Shared by every publish call.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    async fn create_channel(&self) -> Result<Box<dyn PublishChannel>>;
}

/// A channel owned by exactly one publish worker.
#[async_trait]
pub trait PublishChannel: Send + Sync {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl ChannelFactory for Connection {
    async fn create_channel(&self) -> Result<Box<dyn PublishChannel>> {
        let channel = Connection::create_channel(self)
            .await
            .map_err(PublishError::ChannelOpen)?;
        debug!(channel_id = channel.id(), "Opened publish channel");
        Ok(Box::new(AmqpChannel(channel)))
    }
}

pub struct AmqpChannel(lapin::Channel);

#[async_trait]
impl PublishChannel for AmqpChannel {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<()> {
        // No confirm_select on this channel, so the returned confirm is
        // already resolved to NotRequested and there is nothing to await.
        self.0
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(PublishError::Publish)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.0
            .close(200, "publish complete")
            .await
            .map_err(PublishError::ChannelClose)
    }
}
