use boxoffice_core::object::CONFIRMATION_FIELD;
use boxoffice_core::time::{EPOCH, format_timestamp};
use boxoffice_core::{Object, Record};
use boxoffice_storage::DynStore;
use serde_json::Value;
use time::OffsetDateTime;

use super::{RecordService, ServiceError, ServiceResult};
use crate::cache::RecordCache;
use crate::queue::DynProducer;

/// Objects are cached per id only; listing always reads the store.
///
/// Creating an object announces it on `publish_topic`. The confirmation
/// timestamp is written only by [`ObjectService::confirm`].
#[derive(Clone)]
pub struct ObjectService {
    inner: RecordService<Object>,
    producer: DynProducer,
    publish_topic: String,
}

impl ObjectService {
    pub fn new(
        store: DynStore,
        cache: RecordCache,
        producer: DynProducer,
        publish_topic: impl Into<String>,
    ) -> Self {
        Self {
            inner: RecordService::new(store, cache).without_list_cache(),
            producer,
            publish_topic: publish_topic.into(),
        }
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Object>> {
        self.inner.get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Object> {
        self.inner.get_by_id(id).await
    }

    pub async fn create(&self, mut object: Object) -> ServiceResult<Object> {
        object.confirmation_timestamp = EPOCH;
        let created = self.inner.create(object).await?;
        self.announce(&created);
        Ok(created)
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Object> {
        self.inner.delete(id).await
    }

    pub async fn delete_all(&self) -> ServiceResult<u64> {
        self.inner.delete_all().await
    }

    /// Records the confirmation time of an existing object.
    pub async fn confirm(&self, id: &str, at: OffsetDateTime) -> ServiceResult<Object> {
        let formatted =
            format_timestamp(&at).map_err(|e| ServiceError::Validation(e.to_string()))?;
        self.inner
            .update_field(id, CONFIRMATION_FIELD, Value::String(formatted))
            .await
    }

    /// Publishes `{id, userId}` in the background; the caller does not wait.
    ///
    /// Runs after the insert, so failures here are logged and never reach
    /// the caller.
    fn announce(&self, object: &Object) {
        let notice = object.notice();
        let producer = self.producer.clone();
        let topic = self.publish_topic.clone();
        let key = object.id().to_string();

        tokio::spawn(async move {
            let payload = match serde_json::to_string(&notice) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(id = %key, error = %e, "failed to encode object creation notice");
                    return;
                }
            };
            match producer.publish(&topic, &key, &payload).await {
                Ok(()) => tracing::debug!(topic = %topic, id = %key, "object creation published"),
                Err(e) => {
                    tracing::warn!(topic = %topic, id = %key, error = %e, "failed to publish object creation")
                }
            }
        });
    }
}
