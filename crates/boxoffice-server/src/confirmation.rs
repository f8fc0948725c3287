//! Applies object confirmations received over the queue.
//!
//! Each message carries the object id as key and a timestamp as value. Every
//! message gets exactly one attempt and is acknowledged afterwards, whatever
//! the outcome. Only transport failures are retried, with backoff.

use std::time::Duration;

use boxoffice_core::parse_timestamp;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::queue::{Delivery, DynConsumer};
use crate::services::{ObjectService, ServiceError};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// What happened to one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    UnknownObject,
    MalformedTimestamp,
    Failed,
}

pub struct ConfirmationWorker {
    consumer: DynConsumer,
    objects: ObjectService,
    poll_block: Duration,
    shutdown: CancellationToken,
}

impl ConfirmationWorker {
    pub fn new(
        consumer: DynConsumer,
        objects: ObjectService,
        poll_block: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            consumer,
            objects,
            poll_block,
            shutdown,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consumes until the shutdown token is cancelled.
    pub async fn run(self) {
        tracing::info!("confirmation worker started");
        let mut backoff = INITIAL_BACKOFF;

        loop {
            let batch = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                polled = self.consumer.poll(self.poll_block) => polled,
            };

            match batch {
                Ok(deliveries) => {
                    backoff = INITIAL_BACKOFF;
                    for delivery in &deliveries {
                        self.handle(delivery).await;
                        if let Err(e) = self.consumer.ack(delivery).await {
                            tracing::warn!(entry = %delivery.id, error = %e, "failed to acknowledge message");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in = ?backoff,
                        "queue poll failed, retrying"
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }

        tracing::info!("confirmation worker stopped");
    }

    pub async fn handle(&self, delivery: &Delivery) -> Outcome {
        let id = delivery.key.trim();
        let at = match parse_timestamp(delivery.value.trim()) {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!(id = %id, value = %delivery.value, error = %e, "ignoring confirmation with malformed timestamp");
                return Outcome::MalformedTimestamp;
            }
        };

        match self.objects.confirm(id, at).await {
            Ok(_) => {
                tracing::info!(id = %id, "object confirmed");
                Outcome::Applied
            }
            Err(ServiceError::NotFound(_)) => {
                tracing::warn!(id = %id, "ignoring confirmation for unknown object");
                Outcome::UnknownObject
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to apply confirmation");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, RecordCache};
    use crate::queue::{MemoryBroker, QueueProducer};
    use async_trait::async_trait;
    use boxoffice_core::Object;
    use boxoffice_core::time::EPOCH;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::macros::datetime;

    fn objects(broker: &MemoryBroker) -> ObjectService {
        ObjectService::new(
            boxoffice_db_memory::create_memory_store(),
            RecordCache::new(CacheBackend::new_local(), Duration::from_secs(60)),
            Arc::new(broker.clone()),
            "objects.created",
        )
    }

    fn delivery(key: &str, value: &str) -> Delivery {
        Delivery {
            id: "1-0".into(),
            key: key.into(),
            value: value.into(),
        }
    }

    async fn seeded(svc: &ObjectService) -> Object {
        svc.create(Object {
            id: "obj-1".into(),
            name: "Locker".into(),
            user_id: "u-1".into(),
            confirmation_timestamp: EPOCH,
        })
        .await
        .unwrap()
    }

    fn worker(broker: &MemoryBroker, svc: ObjectService) -> ConfirmationWorker {
        ConfirmationWorker::new(
            Arc::new(broker.consumer("confirmations", 8)),
            svc,
            Duration::from_millis(20),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_handle_outcomes() {
        let broker = MemoryBroker::new();
        let svc = objects(&broker);
        seeded(&svc).await;
        let worker = worker(&broker, svc.clone());

        assert_eq!(
            worker.handle(&delivery("obj-1", "2024-01-01T00:00:00Z")).await,
            Outcome::Applied
        );
        assert_eq!(
            svc.get_by_id("obj-1").await.unwrap().confirmation_timestamp,
            datetime!(2024-01-01 0:00 UTC)
        );

        assert_eq!(
            worker.handle(&delivery("ghost", "2024-01-01T00:00:00Z")).await,
            Outcome::UnknownObject
        );
        assert_eq!(
            worker.handle(&delivery("obj-1", "yesterday")).await,
            Outcome::MalformedTimestamp
        );
        assert!(svc.get_by_id("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_naive_timestamp_is_utc() {
        let broker = MemoryBroker::new();
        let svc = objects(&broker);
        seeded(&svc).await;
        let worker = worker(&broker, svc.clone());

        worker
            .handle(&delivery("obj-1", "2024-06-30T12:15:00"))
            .await;
        assert_eq!(
            svc.get_by_id("obj-1").await.unwrap().confirmation_timestamp,
            datetime!(2024-06-30 12:15 UTC)
        );
    }

    #[tokio::test]
    async fn test_bad_message_does_not_stop_the_loop() {
        let broker = MemoryBroker::new();
        let svc = objects(&broker);
        seeded(&svc).await;

        let shutdown = CancellationToken::new();
        let handle = ConfirmationWorker::new(
            Arc::new(broker.consumer("confirmations", 8)),
            svc.clone(),
            Duration::from_millis(20),
            shutdown.clone(),
        )
        .spawn();

        broker.publish("confirmations", "obj-1", "garbage").await.unwrap();
        broker.publish("confirmations", "ghost", "2024-01-01T00:00:00Z").await.unwrap();
        broker.publish("confirmations", "obj-1", "2024-01-01T00:00:00Z").await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            // Listing objects bypasses the cache.
            let object = svc.get_all().await.unwrap().remove(0);
            if object.is_confirmed() {
                assert_eq!(object.confirmation_timestamp, datetime!(2024-01-01 0:00 UTC));
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "confirmation not applied");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    struct FailingConsumer {
        polls: AtomicUsize,
    }

    #[async_trait]
    impl crate::queue::QueueConsumer for FailingConsumer {
        async fn poll(&self, _block: Duration) -> Result<Vec<Delivery>, crate::queue::QueueError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Err(crate::queue::QueueError::Connection("refused".into()))
        }

        async fn ack(&self, _delivery: &Delivery) -> Result<(), crate::queue::QueueError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_back_off_and_cancel() {
        let broker = MemoryBroker::new();
        let consumer = Arc::new(FailingConsumer {
            polls: AtomicUsize::new(0),
        });
        let shutdown = CancellationToken::new();
        let handle = ConfirmationWorker::new(
            consumer.clone(),
            objects(&broker),
            Duration::from_millis(20),
            shutdown.clone(),
        )
        .spawn();

        // 1s + 2s + 4s of backoff fit before the fourth poll.
        tokio::time::sleep(Duration::from_millis(7_500)).await;
        assert_eq!(consumer.polls.load(Ordering::SeqCst), 4);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
