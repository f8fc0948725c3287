//! Redis Streams transport.
//!
//! Each topic is a stream. Entries carry two fields, `key` and `value`.
//! Consumers read through a consumer group so several instances share the
//! load. A restarted instance first receives the entries it had been handed
//! but never acknowledged, then continues with new ones.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamReadOptions, StreamReadReply};
use tokio::sync::Mutex;

use super::{Delivery, QueueConsumer, QueueError, QueueProducer};

const KEY_FIELD: &str = "key";
const VALUE_FIELD: &str = "value";

pub struct RedisStreamProducer {
    pool: Pool,
}

impl RedisStreamProducer {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueProducer for RedisStreamProducer {
    async fn publish(&self, topic: &str, key: &str, value: &str) -> Result<(), QueueError> {
        let mut conn = self.pool.get().await?;
        let id: String = conn
            .xadd(topic, "*", &[(KEY_FIELD, key), (VALUE_FIELD, value)])
            .await?;
        tracing::debug!(topic = %topic, key = %key, entry = %id, "message appended to stream");
        Ok(())
    }
}

/// Group reader with its own connection, since XREADGROUP blocks it.
///
/// The connection is reopened after a connection error or a missing group,
/// and every new connection first replays this consumer's pending entries
/// (delivered before but never acknowledged) before reading new ones.
pub struct RedisStreamConsumer {
    client: redis::Client,
    state: Mutex<ReaderState>,
    stream: String,
    group: String,
    consumer: String,
    batch_size: usize,
}

#[derive(Default)]
struct ReaderState {
    conn: Option<MultiplexedConnection>,
    /// Where the pending-entry replay continues; `None` once it is done
    replay_from: Option<String>,
}

impl RedisStreamConsumer {
    /// Opens a connection and creates the group (and stream) if missing.
    pub async fn connect(
        url: &str,
        stream: &str,
        group: &str,
        consumer: &str,
        batch_size: usize,
    ) -> Result<Self, QueueError> {
        let this = Self {
            client: redis::Client::open(url)?,
            state: Mutex::new(ReaderState::default()),
            stream: stream.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
            batch_size: batch_size.max(1),
        };
        this.connection().await?;
        Ok(this)
    }

    /// The live connection and replay cursor, reconnecting when needed.
    async fn connection(&self) -> Result<(MultiplexedConnection, Option<String>), QueueError> {
        let mut state = self.state.lock().await;
        if let Some(conn) = &state.conn {
            return Ok((conn.clone(), state.replay_from.clone()));
        }

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.ensure_group(&mut conn).await?;
        tracing::debug!(stream = %self.stream, consumer = %self.consumer, "stream reader connected");
        state.conn = Some(conn.clone());
        state.replay_from = Some("0".to_string());
        Ok((conn, state.replay_from.clone()))
    }

    async fn ensure_group(&self, conn: &mut MultiplexedConnection) -> Result<(), QueueError> {
        let created: redis::RedisResult<()> = conn
            .xgroup_create_mkstream(&self.stream, &self.group, "0")
            .await;
        match created {
            Ok(()) => {
                tracing::info!(stream = %self.stream, group = %self.group, "consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn on_error(&self, e: redis::RedisError) -> QueueError {
        if needs_reconnect(&e) {
            tracing::warn!(stream = %self.stream, error = %e, "stream reader lost, reconnecting on next poll");
            self.state.lock().await.conn = None;
        }
        e.into()
    }
}

/// Errors after which the connection or the group can no longer be used.
fn needs_reconnect(e: &redis::RedisError) -> bool {
    e.is_connection_dropped()
        || e.is_connection_refusal()
        || e.is_io_error()
        || e.is_timeout()
        || e.code() == Some("NOGROUP")
}

fn field(entry: &redis::streams::StreamId, name: &str) -> String {
    entry.get::<String>(name).unwrap_or_default()
}

#[async_trait]
impl QueueConsumer for RedisStreamConsumer {
    async fn poll(&self, block: Duration) -> Result<Vec<Delivery>, QueueError> {
        loop {
            let (mut conn, replay_from) = self.connection().await?;

            let mut opts = StreamReadOptions::default()
                .group(&self.group, &self.consumer)
                .count(self.batch_size);
            let start = match &replay_from {
                Some(id) => id.as_str(),
                None => {
                    let block_ms = usize::try_from(block.as_millis()).unwrap_or(usize::MAX).max(1);
                    opts = opts.block(block_ms);
                    ">"
                }
            };

            let reply: Option<StreamReadReply> =
                match conn.xread_options(&[&self.stream], &[start], &opts).await {
                    Ok(reply) => reply,
                    Err(e) => return Err(self.on_error(e).await),
                };

            let deliveries: Vec<Delivery> = reply
                .into_iter()
                .flat_map(|reply| reply.keys)
                .flat_map(|key| key.ids)
                .map(|entry| Delivery {
                    key: field(&entry, KEY_FIELD),
                    value: field(&entry, VALUE_FIELD),
                    id: entry.id,
                })
                .collect();

            if replay_from.is_some() {
                let mut state = self.state.lock().await;
                state.replay_from = deliveries.last().map(|d| d.id.clone());
                if deliveries.is_empty() {
                    tracing::debug!(stream = %self.stream, "pending entries replayed");
                    continue;
                }
                tracing::info!(
                    stream = %self.stream,
                    count = deliveries.len(),
                    "redelivering unacknowledged entries"
                );
            }
            return Ok(deliveries);
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let (mut conn, _) = self.connection().await?;
        let acked: redis::RedisResult<i64> =
            conn.xack(&self.stream, &self.group, &[&delivery.id]).await;
        match acked {
            Ok(_) => Ok(()),
            Err(e) => Err(self.on_error(e).await),
        }
    }
}
