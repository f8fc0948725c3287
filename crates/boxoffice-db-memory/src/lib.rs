//! In-memory record store backend for the boxoffice server.
//!
//! This crate provides an in-memory implementation of the `DocumentStore`
//! trait from `boxoffice-storage`, using a `DashMap` for concurrent access.
//! It backs local development and the integration tests.
//!
//! # Example
//!
//! ```ignore
//! use boxoffice_db_memory::InMemoryStore;
//! use boxoffice_storage::DocumentStore;
//!
//! let store = InMemoryStore::new();
//! store.insert("events", "evt-1", serde_json::json!({"id": "evt-1"})).await?;
//! ```

mod storage;

pub use boxoffice_storage::{DocumentStore, StorageError};
pub use storage::{InMemoryStore, StorageKey};

/// Creates a new shareable in-memory store.
pub fn create_memory_store() -> boxoffice_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
