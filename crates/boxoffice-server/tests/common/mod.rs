#![allow(dead_code)]

use std::time::Duration;

use boxoffice_server::{AppConfig, MemoryBroker, ServerBuilder};
use serde_json::Value;
use tokio::task::JoinHandle;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    pub broker: MemoryBroker,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.secret_key = TEST_SECRET.into();
    cfg.queue.block_ms = 50;
    cfg
}

pub async fn start_server() -> TestServer {
    start_server_with(test_config()).await
}

pub async fn start_server_with(cfg: AppConfig) -> TestServer {
    let server = ServerBuilder::new()
        .with_config(cfg)
        .build()
        .await
        .expect("build server");
    let broker = server.broker().cloned().expect("memory queue");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = rx.await;
    }));

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        broker,
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn token(&self) -> String {
        let resp = self
            .client
            .post(self.url("/auth/token"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server stops in time")
                .expect("server task")
                .expect("server result");
        }
    }
}

/// Sends the request and returns the status with the decoded envelope.
pub async fn send(req: reqwest::RequestBuilder) -> (u16, Value) {
    let resp = req.send().await.unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    (status, body)
}
