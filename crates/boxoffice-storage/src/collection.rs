use std::marker::PhantomData;

use boxoffice_core::Record;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::UpdateOutcome;
use crate::{DynStore, StorageResult};

/// Typed view over the collection that holds records of kind `R`.
#[derive(Clone)]
pub struct Collection<R: Record> {
    store: DynStore,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Collection<R> {
    pub fn new(store: DynStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        R::KIND.collection()
    }

    pub async fn insert(&self, record: &R) -> StorageResult<()> {
        let document = serde_json::to_value(record)?;
        self.store.insert(self.name(), record.id(), document).await
    }

    pub async fn find(&self, id: &str) -> StorageResult<Option<R>> {
        self.store
            .find(self.name(), id)
            .await?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    pub async fn list(&self) -> StorageResult<Vec<R>> {
        self.store
            .list(self.name())
            .await?
            .into_iter()
            .map(|doc| self.decode(doc))
            .collect()
    }

    pub async fn replace(&self, record: &R) -> StorageResult<UpdateOutcome> {
        let document = serde_json::to_value(record)?;
        self.store
            .replace(self.name(), record.id(), document)
            .await
    }

    pub async fn set_field(
        &self,
        id: &str,
        field: &str,
        value: Value,
    ) -> StorageResult<UpdateOutcome> {
        self.store.set_field(self.name(), id, field, value).await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<Option<R>> {
        self.store
            .delete(self.name(), id)
            .await?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    fn decode(&self, document: Value) -> StorageResult<R> {
        serde_json::from_value(document)
            .map_err(|e| StorageError::invalid_record(format!("{}: {e}", self.name())))
    }
}
