use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, middleware, middleware::from_fn_with_state, routing::get};
use boxoffice_auth::{TokenService, require_bearer};
use boxoffice_db_postgres::PostgresStore;
use boxoffice_storage::DynStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::{self, CacheBackend, RecordCache};
use crate::confirmation::ConfirmationWorker;
use crate::config::{AppConfig, StorageBackend};
use crate::queue::{self, MemoryBroker};
use crate::services::{EventService, ObjectService, TicketService};
use crate::{handlers, middleware as app_middleware, routes};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub events: EventService,
    pub tickets: TicketService,
    pub objects: ObjectService,
    pub tokens: Arc<TokenService>,
    pub store: DynStore,
    pub cache: CacheBackend,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let bearer = from_fn_with_state(state.tokens.clone(), require_bearer);

    let events = if cfg.auth.protect_events {
        routes::events::router().route_layer(bearer.clone())
    } else {
        routes::events::router()
    };
    let protected = Router::new()
        .merge(routes::tickets::router())
        .merge(routes::objects::router())
        .route_layer(bearer);

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .merge(routes::auth::router())
        .merge(events)
        .merge(protected)
        .with_state(state)
        // Middleware stack (outermost first): request id -> trace -> cors/compression -> body limit
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new())
                .layer(axum::extract::DefaultBodyLimit::max(body_limit)),
        )
}

pub struct BoxofficeServer {
    addr: SocketAddr,
    app: Router,
    worker: ConfirmationWorker,
    shutdown: CancellationToken,
    broker: Option<MemoryBroker>,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects the store, cache and queue and wires the services together.
    pub async fn build(self) -> anyhow::Result<BoxofficeServer> {
        let cfg = self.config;

        let store = create_store(&cfg).await?;
        let redis = cache::connect_redis(&cfg.redis).await;
        let cache_backend = cache::create_cache_backend(&cfg.cache, redis.as_ref());
        let records_cache = RecordCache::new(cache_backend.clone(), cfg.cache.ttl);

        let queue = queue::create_queue(&cfg.queue, redis.as_ref(), &cfg.redis.url)
            .await
            .context("queue initialization failed")?;

        let tokens = Arc::new(
            TokenService::new(&cfg.auth).context("token service initialization failed")?,
        );

        let objects = ObjectService::new(
            store.clone(),
            records_cache.clone(),
            queue.producer.clone(),
            cfg.queue.publish_topic.clone(),
        );
        let state = AppState {
            events: EventService::new(store.clone(), records_cache.clone()),
            tickets: TicketService::new(store.clone(), records_cache),
            objects: objects.clone(),
            tokens,
            store,
            cache: cache_backend,
        };

        let shutdown = CancellationToken::new();
        let worker = ConfirmationWorker::new(
            queue.consumer,
            objects,
            Duration::from_millis(cfg.queue.block_ms),
            shutdown.child_token(),
        );

        Ok(BoxofficeServer {
            addr: self.addr,
            app: build_app(state, &cfg),
            worker,
            shutdown,
            broker: queue.broker,
        })
    }
}

async fn create_store(cfg: &AppConfig) -> anyhow::Result<DynStore> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory record store");
            Ok(boxoffice_db_memory::create_memory_store())
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .context("storage.backend=postgres requires storage.postgres")?;
            let store = PostgresStore::from_config(&pg.to_backend_config())
                .await
                .context("PostgreSQL initialization failed")?;
            tracing::info!("Using PostgreSQL record store");
            Ok(Arc::new(store))
        }
    }
}

impl BoxofficeServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// The in-memory broker, when `queue.backend = "memory"`.
    pub fn broker(&self) -> Option<&MemoryBroker> {
        self.broker.as_ref()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `signal` completes, then stops the
    /// confirmation worker and waits for it.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let worker = self.worker.spawn();
        let shutdown = self.shutdown.clone();

        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = signal => {}
                    _ = shutdown.cancelled() => {}
                }
            })
            .await;

        self.shutdown.cancel();
        if let Err(e) = worker.await {
            tracing::error!(error = %e, "confirmation worker panicked");
        }
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
