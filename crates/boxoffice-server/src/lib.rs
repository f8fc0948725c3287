pub mod cache;
pub mod confirmation;
pub mod config;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod queue;
pub mod routes;
pub mod server;
pub mod services;

pub use cache::{CacheBackend, CachedEntry, RecordCache, connect_redis, create_cache_backend};
pub use config::{AppConfig, CacheConfig, PostgresStorageConfig, QueueConfig, RedisConfig, ServerConfig};
pub use confirmation::ConfirmationWorker;
pub use observability::init_tracing;
pub use queue::{Delivery, MemoryBroker, QueueConsumer, QueueProducer};
pub use server::{AppState, BoxofficeServer, ServerBuilder, build_app};
