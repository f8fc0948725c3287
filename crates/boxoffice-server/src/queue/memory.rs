//! In-process broker for single-instance deployments and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{Delivery, QueueConsumer, QueueError, QueueProducer};

/// Messages kept per topic before the oldest are dropped.
pub const DEFAULT_TOPIC_CAPACITY: usize = 10_000;

struct BrokerInner {
    topics: Mutex<HashMap<String, VecDeque<Delivery>>>,
    published: Notify,
    next_id: AtomicU64,
    capacity: usize,
}

/// Topics held in memory. Messages are removed when a consumer polls them.
///
/// Each topic holds at most `capacity` messages; publishing past that drops
/// the oldest one, so a topic nobody consumes stays bounded.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: Mutex::new(HashMap::new()),
                published: Notify::new(),
                next_id: AtomicU64::new(0),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn consumer(&self, topic: &str, batch_size: usize) -> MemoryConsumer {
        MemoryConsumer {
            broker: self.clone(),
            topic: topic.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    /// Snapshot of messages waiting on `topic`.
    pub async fn pending(&self, topic: &str) -> Vec<Delivery> {
        let topics = self.inner.topics.lock().await;
        topics
            .get(topic)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn take(&self, topic: &str, max: usize) -> Vec<Delivery> {
        let mut topics = self.inner.topics.lock().await;
        match topics.get_mut(topic) {
            Some(queue) => {
                let n = max.min(queue.len());
                queue.drain(..n).collect()
            }
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl QueueProducer for MemoryBroker {
    async fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), QueueError> {
        let seq = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let delivery = Delivery {
            id: format!("{seq}-0"),
            key: key.to_string(),
            value: value.to_string(),
        };
        let dropped = {
            let mut topics = self.inner.topics.lock().await;
            let queue = topics.entry(topic.to_string()).or_default();
            queue.push_back(delivery);
            let excess = queue.len().saturating_sub(self.inner.capacity);
            queue.drain(..excess).count()
        };
        if dropped > 0 {
            tracing::debug!(topic = %topic, dropped, "in-memory topic full, oldest messages dropped");
        }
        self.inner.published.notify_waiters();
        tracing::trace!(topic = %topic, key = %key, "message queued in memory");
        Ok(())
    }
}

pub struct MemoryConsumer {
    broker: MemoryBroker,
    topic: String,
    batch_size: usize,
}

#[async_trait]
impl QueueConsumer for MemoryConsumer {
    async fn poll(&self, block: Duration) -> Result<Vec<Delivery>, QueueError> {
        let notified = self.broker.inner.published.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let batch = self.broker.take(&self.topic, self.batch_size).await;
        if !batch.is_empty() {
            return Ok(batch);
        }

        if tokio::time::timeout(block, notified).await.is_err() {
            return Ok(Vec::new());
        }
        Ok(self.broker.take(&self.topic, self.batch_size).await)
    }

    async fn ack(&self, _delivery: &Delivery) -> Result<(), QueueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_poll_returns_published_messages_in_order() {
        let broker = MemoryBroker::new();
        broker.publish("t", "a", "1").await.unwrap();
        broker.publish("t", "b", "2").await.unwrap();
        broker.publish("other", "c", "3").await.unwrap();

        let consumer = broker.consumer("t", 10);
        let batch = consumer.poll(Duration::from_millis(10)).await.unwrap();
        let keys: Vec<_> = batch.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert!(broker.pending("t").await.is_empty());
        assert_eq!(broker.pending("other").await.len(), 1);
    }

    #[tokio::test]
    async fn test_poll_respects_batch_size() {
        let broker = MemoryBroker::new();
        for i in 0..3 {
            broker.publish("t", &i.to_string(), "v").await.unwrap();
        }
        let consumer = broker.consumer("t", 2);
        assert_eq!(consumer.poll(Duration::ZERO).await.unwrap().len(), 2);
        assert_eq!(consumer.poll(Duration::ZERO).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_times_out_empty() {
        let broker = MemoryBroker::new();
        let consumer = broker.consumer("t", 1);
        let batch = consumer.poll(Duration::from_millis(20)).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_full_topic_drops_oldest() {
        let broker = MemoryBroker::with_capacity(3);
        for i in 0..5 {
            broker.publish("t", &i.to_string(), "v").await.unwrap();
        }

        let keys: Vec<_> = broker.pending("t").await.into_iter().map(|d| d.key).collect();
        assert_eq!(keys, ["2", "3", "4"]);

        let consumer = broker.consumer("t", 10);
        assert_eq!(consumer.poll(Duration::ZERO).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_poll_wakes_on_publish() {
        let broker = MemoryBroker::new();
        let consumer = broker.consumer("t", 1);

        let producer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            producer.publish("t", "late", "v").await.unwrap();
        });

        let batch = consumer.poll(Duration::from_secs(5)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].key, "late");
    }
}
