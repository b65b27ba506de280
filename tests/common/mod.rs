// Shared fixtures for the integration tests: an in-memory broker and a log
// sink the tests can read back.
#![allow(dead_code)]

use async_trait::async_trait;
use lapin::BasicProperties;
use rabbit_dsl::publisher::{ChannelFactory, PublishChannel};
use rabbit_dsl::PublishError;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Published {
    pub channel: usize,
    pub exchange: String,
    pub routing_key: String,
    pub properties: BasicProperties,
    pub body: Vec<u8>,
}

#[derive(Default)]
pub struct MockBroker {
    pub latency: Duration,
    pub fail_publish: bool,
    pub fail_close: bool,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub published: Mutex<Vec<Published>>,
}

impl MockBroker {
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_publish: true,
            ..Self::default()
        })
    }

    pub fn failing_close(fail_publish: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_publish,
            fail_close: true,
            ..Self::default()
        })
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

pub struct MockChannel {
    id: usize,
    broker: Arc<MockBroker>,
}

/// Wrapper so the test keeps its own `Arc<MockBroker>` while the publisher
/// gets an `Arc<dyn ChannelFactory>`.
pub struct Factory(pub Arc<MockBroker>);

#[async_trait]
impl ChannelFactory for Factory {
    async fn create_channel(&self) -> Result<Box<dyn PublishChannel>, PublishError> {
        let id = self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChannel {
            id,
            broker: Arc::clone(&self.0),
        }))
    }
}

#[async_trait]
impl PublishChannel for MockChannel {
    async fn basic_publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: BasicProperties,
        body: &[u8],
    ) -> Result<(), PublishError> {
        if !self.broker.latency.is_zero() {
            tokio::time::sleep(self.broker.latency).await;
        }
        if self.broker.fail_publish {
            return Err(PublishError::Broker("simulated broker outage".to_string()));
        }
        self.broker.published.lock().unwrap().push(Published {
            channel: self.id,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties,
            body: body.to_vec(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<(), PublishError> {
        self.broker.closed.fetch_add(1, Ordering::SeqCst);
        if self.broker.fail_close {
            return Err(PublishError::Broker("simulated close failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory writer for a tracing fmt subscriber.
#[derive(Clone, Default)]
pub struct LogSink(Arc<Mutex<Vec<u8>>>);

impl LogSink {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Route this thread's tracing output into the sink until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
