//! # boxoffice-storage
//!
//! Record store abstraction for the boxoffice server.
//!
//! This crate defines the [`DocumentStore`] trait and the typed
//! [`Collection`] wrapper used by the record services. It does not contain
//! any backend; those live in `boxoffice-db-memory` and
//! `boxoffice-db-postgres`.

mod collection;
mod error;
mod traits;
mod types;

pub use collection::Collection;
pub use error::{ErrorCategory, StorageError};
pub use traits::DocumentStore;
pub use types::UpdateOutcome;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn DocumentStore>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Collection, DocumentStore, DynStore, StorageError, StorageResult, UpdateOutcome,
    };
}
