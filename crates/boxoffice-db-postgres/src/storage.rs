//! `DocumentStore` implementation over one JSONB table per collection.

use async_trait::async_trait;
use boxoffice_storage::{DocumentStore, StorageError, UpdateOutcome};
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, is_unique_violation};
use crate::{migrations, pool};

/// PostgreSQL record store. Each collection maps to a table `(id TEXT PRIMARY KEY, doc JSONB)`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing pool. The tables must already exist.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects, optionally runs migrations, and returns a ready store.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or a migration fails.
    pub async fn from_config(config: &PostgresConfig) -> Result<Self, PostgresError> {
        let pool = pool::create_pool(config).await?;
        pool::test_connection(&pool).await?;
        if config.run_migrations {
            migrations::run(&pool).await?;
        }
        info!("PostgreSQL record store ready");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Table names are interpolated into SQL, so only `[a-z_][a-z0-9_]*` is accepted.
    pub fn table_name(collection: &str) -> Result<&str, PostgresError> {
        let mut chars = collection.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid_start && valid_rest {
            Ok(collection)
        } else {
            Err(PostgresError::invalid_collection(collection))
        }
    }
}

fn storage_err(err: sqlx_core::error::Error) -> StorageError {
    PostgresError::from(err).into()
}

#[async_trait]
impl DocumentStore for PostgresStore {
    #[instrument(skip(self, document))]
    async fn insert(&self, collection: &str, id: &str, document: Value) -> Result<(), StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)");

        query(&sql)
            .bind(id)
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StorageError::already_exists(collection, id)
                } else {
                    storage_err(e)
                }
            })?;

        debug!("Inserted document");
        Ok(())
    }

    async fn find(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!("SELECT doc FROM {table} WHERE id = $1");

        let row: Option<(Value,)> = query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|(doc,)| doc))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Value>, StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!("SELECT doc FROM {table} ORDER BY id");

        let rows: Vec<(Value,)> = query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(rows.into_iter().map(|(doc,)| doc).collect())
    }

    #[instrument(skip(self, document))]
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<UpdateOutcome, StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!(
            "WITH target AS (SELECT id, doc FROM {table} WHERE id = $1 FOR UPDATE), \
             updated AS ( \
                 UPDATE {table} AS t SET doc = $2 FROM target \
                 WHERE t.id = target.id AND target.doc IS DISTINCT FROM $2::jsonb \
                 RETURNING t.id) \
             SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)"
        );

        let (matched, modified): (i64, i64) = query_as(&sql)
            .bind(id)
            .bind(document)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(outcome(matched, modified))
    }

    #[instrument(skip(self, value))]
    async fn set_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<UpdateOutcome, StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!(
            "WITH target AS (SELECT id, doc FROM {table} WHERE id = $1 FOR UPDATE), \
             updated AS ( \
                 UPDATE {table} AS t SET doc = jsonb_set(t.doc, ARRAY[$2::text], $3::jsonb) \
                 FROM target \
                 WHERE t.id = target.id AND (target.doc -> $2::text) IS DISTINCT FROM $3::jsonb \
                 RETURNING t.id) \
             SELECT (SELECT COUNT(*) FROM target), (SELECT COUNT(*) FROM updated)"
        );

        let (matched, modified): (i64, i64) = query_as(&sql)
            .bind(id)
            .bind(field)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(outcome(matched, modified))
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let table = Self::table_name(collection)?;
        let sql = format!("DELETE FROM {table} WHERE id = $1 RETURNING doc");

        let row: Option<(Value,)> = query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|(doc,)| doc))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn outcome(matched: i64, modified: i64) -> UpdateOutcome {
    UpdateOutcome::new(matched.max(0) as u64, modified.max(0) as u64)
}
