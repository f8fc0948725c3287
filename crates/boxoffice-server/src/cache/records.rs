//! Record read caching.
//!
//! ## Cache Key Format
//!
//! - `list:{kind}` holds the whole collection snapshot, e.g. `list:event`
//! - `item:{kind}:{id}` holds one record, e.g. `item:ticket:42`
//!
//! Entries are MessagePack encoded. A payload that no longer decodes is
//! evicted and treated as a miss.

use std::time::Duration;

use boxoffice_core::{Record, RecordKind};

use super::backend::CacheBackend;

#[derive(Clone)]
pub struct RecordCache {
    backend: CacheBackend,
    ttl: Duration,
}

impl RecordCache {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    #[inline]
    pub fn list_key(kind: RecordKind) -> String {
        format!("list:{kind}")
    }

    #[inline]
    pub fn item_key(kind: RecordKind, id: &str) -> String {
        format!("item:{kind}:{id}")
    }

    pub async fn get_item<R: Record>(&self, id: &str) -> Option<R> {
        self.read(&Self::item_key(R::KIND, id)).await
    }

    pub async fn put_item<R: Record>(&self, record: &R) {
        self.write(&Self::item_key(R::KIND, record.id()), record)
            .await;
    }

    pub async fn get_list<R: Record>(&self) -> Option<Vec<R>> {
        self.read(&Self::list_key(R::KIND)).await
    }

    pub async fn put_list<R: Record>(&self, records: &[R]) {
        self.write(&Self::list_key(R::KIND), &records).await;
    }

    /// Drops the list snapshot of `kind` and, when given, the entry for `id`.
    ///
    /// Failures are logged and otherwise ignored; the entry expires on its own.
    pub async fn invalidate(&self, kind: RecordKind, id: Option<&str>) {
        let list_key = Self::list_key(kind);
        let item_key = id.map(|id| Self::item_key(kind, id));

        let list = self.backend.invalidate(&list_key);
        let item = async {
            match item_key.as_deref() {
                Some(key) => self.backend.invalidate(key).await.map_err(|e| (key, e)),
                None => Ok(()),
            }
        };
        let (list_result, item_result) = futures_util::future::join(list, item).await;

        if let Err(e) = list_result {
            tracing::warn!(key = %list_key, error = %e, "cache invalidation failed");
        }
        if let Err((key, e)) = item_result {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let Some(bytes) = self.backend.get(key).await else {
            tracing::debug!(key = %key, "cache miss");
            return None;
        };
        match rmp_serde::from_slice::<T>(&bytes) {
            Ok(value) => {
                tracing::debug!(key = %key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "dropping undecodable cache entry");
                if let Err(e) = self.backend.invalidate(key).await {
                    tracing::warn!(key = %key, error = %e, "cache invalidation failed");
                }
                None
            }
        }
    }

    async fn write<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = match rmp_serde::to_vec_named(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = self.backend.set(key, bytes, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::Ticket;
    use boxoffice_core::time::EPOCH;

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: id.into(),
            event_id: "evt-1".into(),
            buyer_name: "Ada".into(),
            purchase_date: EPOCH,
        }
    }

    fn cache() -> RecordCache {
        RecordCache::new(CacheBackend::new_local(), Duration::from_secs(60))
    }

    #[test]
    fn test_key_format() {
        assert_eq!(RecordCache::list_key(RecordKind::Event), "list:event");
        assert_eq!(
            RecordCache::item_key(RecordKind::Ticket, "42"),
            "item:ticket:42"
        );
    }

    #[tokio::test]
    async fn test_item_roundtrip_and_invalidate() {
        let cache = cache();
        cache.put_item(&ticket("t1")).await;
        assert_eq!(cache.get_item::<Ticket>("t1").await, Some(ticket("t1")));

        cache.invalidate(RecordKind::Ticket, Some("t1")).await;
        assert_eq!(cache.get_item::<Ticket>("t1").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_drops_list_snapshot() {
        let cache = cache();
        cache.put_list(&[ticket("a"), ticket("b")]).await;
        assert_eq!(cache.get_list::<Ticket>().await.map(|l| l.len()), Some(2));

        cache.invalidate(RecordKind::Ticket, None).await;
        assert_eq!(cache.get_list::<Ticket>().await, None);

        // Invalidating keys that are not cached is a no-op.
        cache.invalidate(RecordKind::Ticket, Some("missing")).await;
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_evicted() {
        let cache = cache();
        let key = RecordCache::item_key(RecordKind::Ticket, "bad");
        cache
            .backend()
            .set(&key, vec![0xc1, 0xc1], Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get_item::<Ticket>("bad").await, None);
        assert_eq!(cache.backend().get(&key).await, None);
    }

    #[tokio::test]
    async fn test_kinds_do_not_collide() {
        let cache = cache();
        cache.put_item(&ticket("same")).await;
        assert!(cache.get_item::<boxoffice_core::Event>("same").await.is_none());
    }
}
