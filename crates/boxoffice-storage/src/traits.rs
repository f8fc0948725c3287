//! The record store contract every backend implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::UpdateOutcome;

/// A keyed document store with one namespace per collection.
///
/// Documents are JSON objects. Ids are unique within a collection and are
/// passed separately from the document so backends never have to inspect it.
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use boxoffice_storage::{DocumentStore, StorageError};
///
/// async fn load(store: &dyn DocumentStore, id: &str) -> Result<serde_json::Value, StorageError> {
///     store
///         .find("events", id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("events", id))
/// }
/// ```
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document under `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the id is already taken in
    /// this collection.
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StorageError>;

    /// Reads a document by id. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing documents.
    async fn find(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Lists every document in the collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Value>, StorageError>;

    /// Replaces the whole document stored under `id`.
    ///
    /// A missing id is reported as `UpdateOutcome::NONE`, not as an error.
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<UpdateOutcome, StorageError>;

    /// Sets a single top-level field of the document stored under `id`.
    ///
    /// A missing id is reported as `UpdateOutcome::NONE`, not as an error.
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<UpdateOutcome, StorageError>;

    /// Removes a document and returns what was stored, or `None` if nothing
    /// was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError>;

    /// Returns the name of this storage backend.
    fn backend_name(&self) -> &'static str;
}
