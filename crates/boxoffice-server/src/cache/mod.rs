//! Read caching for records.
//!
//! ## Cache Modes
//!
//! - **Disabled**: `cache.enabled = false`, every read goes to the store
//! - **Local**: Redis disabled or unreachable, entries live in a DashMap
//! - **Redis**: entries are shared by every instance and expire server-side

pub mod backend;
pub mod records;

use std::time::Duration;

pub use backend::{CacheBackend, CacheError, CachedEntry};
pub use records::RecordCache;

use crate::config::{CacheConfig, RedisConfig};

/// Builds the Redis pool shared by the cache and the queue.
///
/// Returns `None` when Redis is disabled or the first connection fails.
pub async fn connect_redis(config: &RedisConfig) -> Option<deadpool_redis::Pool> {
    if !config.enabled {
        tracing::info!("Redis disabled");
        return None;
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let timeout = Duration::from_millis(config.timeout_ms);
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let pool_config = redis_config
        .pool
        .get_or_insert_with(deadpool_redis::PoolConfig::default);
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = Some(timeout);
    pool_config.timeouts.create = Some(timeout);
    pool_config.timeouts.recycle = Some(timeout);

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to create Redis pool");
            return None;
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            Some(pool)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis");
            None
        }
    }
}

/// Picks the cache backend for the configuration and the Redis pool, if any.
///
/// An enabled cache without a reachable Redis degrades to local mode so the
/// server still starts.
pub fn create_cache_backend(
    config: &CacheConfig,
    redis: Option<&deadpool_redis::Pool>,
) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Record cache disabled");
        return CacheBackend::Disabled;
    }
    match redis {
        Some(pool) => {
            tracing::info!(ttl = ?config.ttl, "Record cache backed by Redis");
            CacheBackend::new_redis(pool.clone())
        }
        None => {
            tracing::info!(ttl = ?config.ttl, "Record cache is process-local");
            CacheBackend::new_local()
        }
    }
}
