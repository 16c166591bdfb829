// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

use bloomguard::config::Config;
use bloomguard::core::state::ServerState;
use bloomguard::core::storage::BloomFilter;
use bloomguard::server::api;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// TestServer runs the public router on an ephemeral local port, backed by a
/// snapshot file in its own temporary directory.
pub struct TestServer {
    pub state: Arc<ServerState>,
    pub base_url: String,
    pub client: reqwest::Client,
    pub snapshot_path: PathBuf,
    // Held so the directory outlives the server.
    _dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server with the default filter dimensions (n=100, p=0.05).
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Starts a server with `config`; the snapshot path is always redirected
    /// into a fresh temporary directory.
    pub async fn with_config(mut config: Config) -> Self {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("warn"))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let snapshot_path = dir.path().join("bloom-filter.json");
        config.persistence.snapshot_path = snapshot_path.to_string_lossy().into_owned();

        let filter = BloomFilter::new(config.filter.params());
        Self::start(config, filter, dir, snapshot_path).await
    }

    /// Starts a server around an existing filter.
    pub async fn with_filter(filter: BloomFilter) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let snapshot_path = dir.path().join("bloom-filter.json");
        let mut config = Config::default();
        config.persistence.snapshot_path = snapshot_path.to_string_lossy().into_owned();
        Self::start(config, filter, dir, snapshot_path).await
    }

    async fn start(
        config: Config,
        filter: BloomFilter,
        dir: TempDir,
        snapshot_path: PathBuf,
    ) -> Self {
        let state = ServerState::new(config, filter);
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let app = api::router(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            state,
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            snapshot_path,
            _dir: dir,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs `{"password": ...}` to `path`, returning the status and JSON body.
    pub async fn post_password(&self, path: &str, password: &str) -> (u16, Value) {
        self.post_json(path, &serde_json::json!({ "password": password }))
            .await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response.json().await.expect("Response was not JSON");
        (status, body)
    }

    pub async fn add(&self, password: &str) -> (u16, Value) {
        self.post_password("/add", password).await
    }

    pub async fn check(&self, password: &str) -> (u16, Value) {
        self.post_password("/check", password).await
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response.json().await.expect("Response was not JSON");
        (status, body)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
