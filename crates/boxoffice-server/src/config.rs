use boxoffice_auth::AuthConfig;
use boxoffice_db_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token signing and route protection
    #[serde(default)]
    pub auth: AuthConfig,
    /// Redis connection shared by the cache and the queue
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }

        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }

        self.auth.validate().map_err(|e| e.to_string())?;

        if self.storage.backend == StorageBackend::Postgres {
            match self.storage.postgres {
                None => return Err("storage.backend=postgres requires storage.postgres".into()),
                Some(ref pg) if pg.url.is_none() && pg.host.is_empty() => {
                    return Err("storage.postgres requires url or host".into());
                }
                Some(ref pg) if pg.pool_size == 0 => {
                    return Err("storage.postgres.pool_size must be > 0".into());
                }
                Some(_) => {}
            }
        }

        if self.cache.enabled && self.cache.ttl.is_zero() {
            return Err("cache.ttl must be > 0 when the cache is enabled".into());
        }

        if self.queue.backend == QueueBackend::Redis && !self.redis.enabled {
            return Err("queue.backend=redis requires redis.enabled=true".into());
        }
        if self.queue.publish_topic.trim().is_empty() || self.queue.listen_topic.trim().is_empty()
        {
            return Err("queue.publish_topic and queue.listen_topic must not be empty".into());
        }
        if self.queue.group.trim().is_empty() || self.queue.consumer_name.trim().is_empty() {
            return Err("queue.group and queue.consumer_name must not be empty".into());
        }
        if self.queue.memory_capacity == 0 {
            return Err("queue.memory_capacity must be > 0".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Which record store backs the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Required when `backend = "postgres"`
    #[serde(default)]
    pub postgres: Option<PostgresStorageConfig>,
}

/// PostgreSQL storage configuration
///
/// If `url` is set it takes precedence. Otherwise a URL is built from
/// `host`, `port`, `user`, `password` and `database`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_postgres_host")]
    pub host: String,
    #[serde(default = "default_postgres_port")]
    pub port: u16,
    #[serde(default = "default_postgres_user")]
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_postgres_database")]
    pub database: String,
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_postgres_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_postgres_host() -> String {
    "localhost".into()
}
fn default_postgres_port() -> u16 {
    5432
}
fn default_postgres_user() -> String {
    "postgres".into()
}
fn default_postgres_database() -> String {
    "boxoffice".into()
}
fn default_postgres_pool_size() -> u32 {
    10
}
fn default_postgres_connect_timeout_ms() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}

impl PostgresStorageConfig {
    pub fn connection_url(&self) -> String {
        if let Some(ref url) = self.url {
            return url.clone();
        }

        let password_part = self
            .password
            .as_ref()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();

        format!(
            "postgres://{}{}@{}:{}/{}",
            self.user, password_part, self.host, self.port, self.database
        )
    }

    pub fn to_backend_config(&self) -> PostgresConfig {
        PostgresConfig::new(self.connection_url())
            .with_pool_size(self.pool_size)
            .with_connect_timeout_ms(self.connect_timeout_ms)
            .with_idle_timeout_ms(self.idle_timeout_ms)
            .with_run_migrations(self.run_migrations)
    }
}

impl Default for PostgresStorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_postgres_host(),
            port: default_postgres_port(),
            user: default_postgres_user(),
            password: None,
            database: default_postgres_database(),
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout_ms(),
            idle_timeout_ms: None,
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Redis connection settings. Without Redis the cache is process-local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Default: false (single-instance deployments)
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_redis_pool_size() -> usize {
    10
}
fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Disable to send every read to the store
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Lifetime of every cache entry
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub ttl: Duration,
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: default_cache_ttl(),
        }
    }
}

/// Which transport carries the object notifications and confirmations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub backend: QueueBackend,
    /// Topic that receives `{id, userId}` when an object is created
    #[serde(default = "default_publish_topic")]
    pub publish_topic: String,
    /// Topic the confirmation worker consumes (`key = id`, `value = timestamp`)
    #[serde(default = "default_listen_topic")]
    pub listen_topic: String,
    /// Consumer group name
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    /// How long one poll blocks waiting for messages
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Messages each in-memory topic keeps before dropping the oldest
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

fn default_publish_topic() -> String {
    "objects.created".into()
}
fn default_listen_topic() -> String {
    "objects.confirmations".into()
}
fn default_group() -> String {
    "boxoffice".into()
}
fn default_consumer_name() -> String {
    "boxoffice-1".into()
}
fn default_block_ms() -> u64 {
    5000
}
fn default_batch_size() -> usize {
    16
}
fn default_memory_capacity() -> usize {
    crate::queue::memory::DEFAULT_TOPIC_CAPACITY
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            publish_topic: default_publish_topic(),
            listen_topic: default_listen_topic(),
            group: default_group(),
            consumer_name: default_consumer_name(),
            block_ms: default_block_ms(),
            batch_size: default_batch_size(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "boxoffice.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., BOXOFFICE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("BOXOFFICE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
