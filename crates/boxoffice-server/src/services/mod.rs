//! Record services: the store as source of truth with a read cache in front.
//!
//! Reads try the cache first and repopulate it on a miss. Writes hit the
//! store first and then drop the list entry and the item entry of the
//! affected record, even when neither is cached.

pub mod events;
pub mod objects;
pub mod tickets;

use boxoffice_api::ApiError;
use boxoffice_core::Record;
use boxoffice_storage::{Collection, DynStore, StorageError};

use crate::cache::RecordCache;

pub use events::EventService;
pub use objects::ObjectService;
pub use tickets::TicketService;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unexpected(String),
}

impl ServiceError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        Self::NotFound(format!("{kind} with id '{id}' not found"))
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match &e {
            StorageError::NotFound { collection, id } => {
                Self::NotFound(format!("{collection} record '{id}' not found"))
            }
            StorageError::AlreadyExists { collection, id } => {
                Self::Conflict(format!("{collection} record with id '{id}' already exists"))
            }
            _ => {
                tracing::debug!(category = %e.category(), error = %e, "storage failure");
                Self::Unexpected(e.to_string())
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Validation(msg) => ApiError::validation(msg),
            ServiceError::Unexpected(msg) => ApiError::internal(msg),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Cache-aside operations shared by every record kind.
#[derive(Clone)]
pub struct RecordService<R: Record> {
    records: Collection<R>,
    cache: RecordCache,
    cache_list: bool,
}

impl<R: Record> RecordService<R> {
    pub fn new(store: DynStore, cache: RecordCache) -> Self {
        Self {
            records: Collection::new(store),
            cache,
            cache_list: true,
        }
    }

    /// Serves `get_all` straight from the store.
    pub fn without_list_cache(mut self) -> Self {
        self.cache_list = false;
        self
    }

    pub fn records(&self) -> &Collection<R> {
        &self.records
    }

    pub async fn get_all(&self) -> ServiceResult<Vec<R>> {
        if self.cache_list
            && let Some(records) = self.cache.get_list::<R>().await
        {
            return Ok(records);
        }

        let records = self.records.list().await?;
        if self.cache_list {
            self.cache.put_list(&records).await;
        }
        Ok(records)
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<R> {
        if let Some(record) = self.cache.get_item::<R>(id).await {
            return Ok(record);
        }

        let record = self
            .records
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(R::KIND.as_str(), id))?;
        self.cache.put_item(&record).await;
        Ok(record)
    }

    /// Inserts the record, assigning a fresh id when it has none.
    pub async fn create(&self, mut record: R) -> ServiceResult<R> {
        record.ensure_id();
        self.records.insert(&record).await?;
        self.invalidate(record.id()).await;
        tracing::info!(kind = %R::KIND, id = %record.id(), "record created");
        Ok(record)
    }

    /// Full replace. Fails with `NotFound` only when no record has the id;
    /// replacing a record with identical content succeeds.
    pub async fn replace(&self, record: R) -> ServiceResult<R> {
        let outcome = self.records.replace(&record).await?;
        if !outcome.is_matched() {
            return Err(ServiceError::not_found(R::KIND.as_str(), record.id()));
        }
        self.invalidate(record.id()).await;
        tracing::info!(
            kind = %R::KIND,
            id = %record.id(),
            modified = outcome.is_modified(),
            "record replaced"
        );
        Ok(record)
    }

    /// Sets one field of a stored record and returns the updated record.
    pub async fn update_field(
        &self,
        id: &str,
        field: &str,
        value: serde_json::Value,
    ) -> ServiceResult<R> {
        let outcome = self.records.set_field(id, field, value).await?;
        if !outcome.is_matched() {
            return Err(ServiceError::not_found(R::KIND.as_str(), id));
        }
        self.invalidate(id).await;
        tracing::debug!(kind = %R::KIND, id = %id, field = %field, "record field updated");

        self.records
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(R::KIND.as_str(), id))
    }

    pub async fn delete(&self, id: &str) -> ServiceResult<R> {
        let deleted = self
            .records
            .delete(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(R::KIND.as_str(), id))?;
        self.invalidate(id).await;
        tracing::info!(kind = %R::KIND, id = %id, "record deleted");
        Ok(deleted)
    }

    /// Deletes every record one by one and returns how many were removed.
    ///
    /// The listing and the deletes are separate store calls. Records created
    /// meanwhile survive, and records deleted meanwhile by someone else are
    /// skipped without counting.
    pub async fn delete_all(&self) -> ServiceResult<u64> {
        let records = self.records.list().await?;
        let mut deleted = 0u64;
        for record in &records {
            if self.records.delete(record.id()).await?.is_some() {
                deleted += 1;
            }
            self.cache.invalidate(R::KIND, Some(record.id())).await;
        }
        self.cache.invalidate(R::KIND, None).await;
        tracing::info!(kind = %R::KIND, deleted, listed = records.len(), "records deleted");
        Ok(deleted)
    }

    pub async fn invalidate(&self, id: &str) {
        self.cache.invalidate(R::KIND, Some(id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheBackend;
    use boxoffice_core::Event;
    use boxoffice_core::time::EPOCH;
    use std::time::Duration;

    fn event(id: &str, name: &str) -> Event {
        Event {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            date: EPOCH,
            price: 10.0,
        }
    }

    fn service() -> (RecordService<Event>, RecordCache) {
        let cache = RecordCache::new(CacheBackend::new_local(), Duration::from_secs(60));
        let store = boxoffice_db_memory::create_memory_store();
        (RecordService::new(store, cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let (svc, _) = service();
        let created = svc.create(event("", "Gala")).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(svc.get_by_id(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let (svc, _) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        let err = svc.create(event("e1", "Other")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(svc.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_is_served_from_cache_until_a_write() {
        let (svc, cache) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        assert_eq!(svc.get_all().await.unwrap().len(), 1);
        assert!(cache.get_list::<Event>().await.is_some());

        svc.create(event("e2", "Jazz")).await.unwrap();
        assert!(cache.get_list::<Event>().await.is_none());
        assert_eq!(svc.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_store() {
        let (svc, cache) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        svc.get_by_id("e1").await.unwrap();

        // Remove behind the service's back; the cached copy still answers.
        svc.records().delete("e1").await.unwrap();
        assert_eq!(svc.get_by_id("e1").await.unwrap().name, "Gala");

        cache.invalidate(boxoffice_core::RecordKind::Event, Some("e1")).await;
        assert!(matches!(
            svc.get_by_id("e1").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_replace_identical_content_succeeds() {
        let (svc, _) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        assert!(svc.replace(event("e1", "Gala")).await.is_ok());
        assert!(matches!(
            svc.replace(event("nope", "Gala")).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_replace_invalidates_item() {
        let (svc, _) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        svc.get_by_id("e1").await.unwrap();
        svc.replace(event("e1", "Renamed")).await.unwrap();
        assert_eq!(svc.get_by_id("e1").await.unwrap().name, "Renamed");
    }

    #[tokio::test]
    async fn test_replace_refreshes_cached_list() {
        let (svc, cache) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        svc.get_all().await.unwrap();
        assert!(cache.get_list::<Event>().await.is_some());

        svc.replace(event("e1", "Renamed")).await.unwrap();
        assert!(cache.get_list::<Event>().await.is_none());
        assert_eq!(svc.get_all().await.unwrap()[0].name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_field_refreshes_cached_list() {
        let (svc, cache) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        svc.get_all().await.unwrap();

        svc.update_field("e1", "name", serde_json::json!("Matinee"))
            .await
            .unwrap();
        assert!(cache.get_list::<Event>().await.is_none());
        assert_eq!(svc.get_all().await.unwrap()[0].name, "Matinee");
    }

    #[tokio::test]
    async fn test_single_delete_refreshes_cached_list() {
        let (svc, cache) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        svc.create(event("e2", "Jazz")).await.unwrap();
        assert_eq!(svc.get_all().await.unwrap().len(), 2);

        svc.delete("e1").await.unwrap();
        assert!(cache.get_list::<Event>().await.is_none());
        let ids: Vec<_> = svc.get_all().await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, ["e2"]);
    }

    #[tokio::test]
    async fn test_delete_returns_record_then_not_found() {
        let (svc, _) = service();
        svc.create(event("e1", "Gala")).await.unwrap();
        assert_eq!(svc.delete("e1").await.unwrap().name, "Gala");
        assert!(matches!(
            svc.delete("e1").await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_all_twice() {
        let (svc, _) = service();
        for id in ["a", "b", "c"] {
            svc.create(event(id, "Gala")).await.unwrap();
        }
        svc.get_all().await.unwrap();

        assert_eq!(svc.delete_all().await.unwrap(), 3);
        assert_eq!(svc.delete_all().await.unwrap(), 0);
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_storage_error_mapping() {
        let err: ServiceError = StorageError::already_exists("events", "e1").into();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err: ServiceError = StorageError::connection_error("refused").into();
        assert!(matches!(err, ServiceError::Unexpected(_)));

        let api: ApiError = ServiceError::Validation("bad".into()).into();
        assert_eq!(api.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }
}
