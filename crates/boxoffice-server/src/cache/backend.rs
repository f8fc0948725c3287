//! Cache backend: disabled, process-local (DashMap) or shared (Redis).

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Errors from a cache write or invalidation. Reads never surface errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("Redis command error: {0}")]
    Command(#[from] redis::RedisError),
}

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Where cached entries live.
///
/// - **Disabled**: every lookup misses, writes are no-ops
/// - **Local**: single-instance mode using a DashMap
/// - **Redis**: shared across instances; entries expire server-side
#[derive(Clone)]
pub enum CacheBackend {
    Disabled,
    Local(Arc<DashMap<String, CachedEntry>>),
    Redis(Pool),
}

impl CacheBackend {
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    pub fn new_redis(redis_pool: Pool) -> Self {
        CacheBackend::Redis(redis_pool)
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Disabled => "disabled",
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// Looks up a key. Absent, empty, expired and unreachable all read as `None`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let data = match self {
            CacheBackend::Disabled => None,
            CacheBackend::Local(map) => {
                let entry = map.get(key)?;
                if entry.is_expired() {
                    drop(entry);
                    map.remove(key);
                    return None;
                }
                Some(entry.data.as_ref().clone())
            }
            CacheBackend::Redis(redis) => match redis.get().await {
                Ok(mut conn) => match conn.get::<_, Option<Vec<u8>>>(key).await {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to get Redis connection");
                    None
                }
            },
        };
        data.filter(|bytes| !bytes.is_empty())
    }

    /// Stores a value with the given TTL.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            CacheBackend::Disabled => Ok(()),
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
                Ok(())
            }
            CacheBackend::Redis(redis) => {
                let mut conn = redis.get().await?;
                let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                conn.pset_ex::<_, _, ()>(key, value, ttl_ms).await?;
                tracing::debug!(key = %key, ttl_ms, "cache set (redis)");
                Ok(())
            }
        }
    }

    /// Removes a key. Removing an absent key succeeds.
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        match self {
            CacheBackend::Disabled => Ok(()),
            CacheBackend::Local(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
                Ok(())
            }
            CacheBackend::Redis(redis) => {
                let mut conn = redis.get().await?;
                conn.del::<_, ()>(key).await?;
                tracing::debug!(key = %key, "cache invalidated (redis)");
                Ok(())
            }
        }
    }

    /// Check if Redis is available (for readiness checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Redis(redis) => redis.get().await.is_ok(),
            _ => false,
        }
    }
}
