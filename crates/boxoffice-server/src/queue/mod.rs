//! Message transport for object notifications and confirmations.
//!
//! Producers append `(key, value)` pairs to a topic. Consumers read them in
//! batches as part of a group and acknowledge each delivery once handled.

pub mod memory;
pub mod streams;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{QueueBackend, QueueConfig};

pub use memory::MemoryBroker;
pub use streams::{RedisStreamConsumer, RedisStreamProducer};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue connection error: {0}")]
    Connection(String),

    #[error("queue command error: {0}")]
    Command(String),

    #[error("queue is not configured: {0}")]
    Configuration(String),
}

impl From<deadpool_redis::PoolError> for QueueError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        QueueError::Connection(e.to_string())
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_dropped() || e.is_connection_refusal() || e.is_io_error() {
            QueueError::Connection(e.to_string())
        } else {
            QueueError::Command(e.to_string())
        }
    }
}

/// One message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-assigned identifier used for acknowledgement
    pub id: String,
    pub key: String,
    pub value: String,
}

#[async_trait]
pub trait QueueProducer: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), QueueError>;
}

#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Waits up to `block` for deliveries on the subscribed topic.
    ///
    /// An empty batch means the wait elapsed without messages.
    async fn poll(&self, block: Duration) -> Result<Vec<Delivery>, QueueError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError>;
}

pub type DynProducer = Arc<dyn QueueProducer>;
pub type DynConsumer = Arc<dyn QueueConsumer>;

/// Producer and consumer selected by the queue configuration.
pub struct QueueHandles {
    pub producer: DynProducer,
    pub consumer: DynConsumer,
    /// Present in memory mode so tests and tools can inject messages
    pub broker: Option<MemoryBroker>,
}

pub async fn create_queue(
    config: &QueueConfig,
    redis: Option<&deadpool_redis::Pool>,
    redis_url: &str,
) -> Result<QueueHandles, QueueError> {
    match config.backend {
        QueueBackend::Memory => {
            tracing::info!(capacity = config.memory_capacity, "Using in-memory queue");
            let broker = MemoryBroker::with_capacity(config.memory_capacity);
            Ok(QueueHandles {
                producer: Arc::new(broker.clone()),
                consumer: Arc::new(broker.consumer(&config.listen_topic, config.batch_size)),
                broker: Some(broker),
            })
        }
        QueueBackend::Redis => {
            let pool = redis.ok_or_else(|| {
                QueueError::Configuration("queue.backend=redis needs a reachable Redis".into())
            })?;
            tracing::info!(
                listen_topic = %config.listen_topic,
                group = %config.group,
                consumer = %config.consumer_name,
                "Using Redis Streams queue"
            );
            let consumer = RedisStreamConsumer::connect(
                redis_url,
                &config.listen_topic,
                &config.group,
                &config.consumer_name,
                config.batch_size,
            )
            .await?;
            Ok(QueueHandles {
                producer: Arc::new(RedisStreamProducer::new(pool.clone())),
                consumer: Arc::new(consumer),
                broker: None,
            })
        }
    }
}
