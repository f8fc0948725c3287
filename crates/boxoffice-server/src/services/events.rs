use boxoffice_core::Event;
use boxoffice_storage::DynStore;

use super::{RecordService, ServiceResult};
use crate::cache::RecordCache;

#[derive(Clone)]
pub struct EventService {
    inner: RecordService<Event>,
}

impl EventService {
    pub fn new(store: DynStore, cache: RecordCache) -> Self {
        Self {
            inner: RecordService::new(store, cache),
        }
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<Event>> {
        self.inner.get_all().await
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Event> {
        self.inner.get_by_id(id).await
    }

    pub async fn create(&self, event: Event) -> ServiceResult<Event> {
        self.inner.create(event).await
    }

    /// Replaces the event stored under `id`; an id in the body is ignored.
    pub async fn update(&self, id: &str, mut event: Event) -> ServiceResult<Event> {
        event.id = id.to_string();
        self.inner.replace(event).await
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<Event> {
        self.inner.delete(id).await
    }

    pub async fn delete_all(&self) -> ServiceResult<u64> {
        self.inner.delete_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use std::time::Duration;
    use time::macros::datetime;

    #[tokio::test]
    async fn test_update_uses_path_id() {
        let svc = EventService::new(
            boxoffice_db_memory::create_memory_store(),
            RecordCache::new(CacheBackend::new_local(), Duration::from_secs(60)),
        );
        let created = svc
            .create(Event {
                id: "e1".into(),
                name: "Gala".into(),
                description: "Opening night".into(),
                date: datetime!(2025-03-01 19:30 UTC),
                price: 42.5,
            })
            .await
            .unwrap();

        let mut changed = created.clone();
        changed.id = "ignored".into();
        changed.price = 50.0;
        let updated = svc.update("e1", changed).await.unwrap();

        assert_eq!(updated.id, "e1");
        assert_eq!(svc.get_by_id("e1").await.unwrap().price, 50.0);
        assert!(svc.get_by_id("ignored").await.is_err());
    }
}
