use async_trait::async_trait;
use boxoffice_storage::{DocumentStore, StorageError, UpdateOutcome};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

pub type StorageKey = String; // Format: "collection/id"

fn make_storage_key(collection: &str, id: &str) -> StorageKey {
    format!("{collection}/{id}")
}

/// In-memory document store keyed by `collection/id`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: DashMap<StorageKey, Value>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StorageError> {
        match self.data.entry(make_storage_key(collection, id)) {
            Entry::Occupied(_) => Err(StorageError::already_exists(collection, id)),
            Entry::Vacant(slot) => {
                slot.insert(document);
                Ok(())
            }
        }
    }

    async fn find(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .data
            .get(&make_storage_key(collection, id))
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        let prefix = format!("{collection}/");
        let mut documents: Vec<(String, Value)> = self
            .data
            .iter()
            .filter_map(|entry| {
                entry
                    .key()
                    .strip_prefix(&prefix)
                    .map(|id| (id.to_string(), entry.value().clone()))
            })
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(documents.into_iter().map(|(_, doc)| doc).collect())
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<UpdateOutcome, StorageError> {
        let Some(mut stored) = self.data.get_mut(&make_storage_key(collection, id)) else {
            return Ok(UpdateOutcome::NONE);
        };
        if *stored == document {
            return Ok(UpdateOutcome::new(1, 0));
        }
        *stored = document;
        Ok(UpdateOutcome::new(1, 1))
    }

    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<UpdateOutcome, StorageError> {
        let Some(mut stored) = self.data.get_mut(&make_storage_key(collection, id)) else {
            return Ok(UpdateOutcome::NONE);
        };
        let Some(object) = stored.as_object_mut() else {
            return Err(StorageError::invalid_record(format!(
                "{collection}/{id} is not a JSON object"
            )));
        };
        if object.get(field) == Some(&value) {
            return Ok(UpdateOutcome::new(1, 0));
        }
        object.insert(field.to_string(), value);
        Ok(UpdateOutcome::new(1, 1))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        Ok(self
            .data
            .remove(&make_storage_key(collection, id))
            .map(|(_, doc)| doc))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
