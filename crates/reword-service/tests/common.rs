//! Common test utilities for reword-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use reword_core::Limits;
use reword_service::{create_router, AppState, ServiceConfig};
use reword_store::RocksStore;

/// A service configuration suitable for tests.
pub fn test_config(data_dir: &str) -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        data_dir: data_dir.to_string(),
        gemini_api_keys: vec!["test-key".into()],
        gemini_model: reword_gemini::DEFAULT_MODEL.into(),
        bot_username: "ParaphraseBot".into(),
        verification_link: "https://example.com/verify".into(),
        limits: Limits::default(),
        session_ttl_seconds: 86_400,
        sweep_interval_seconds: 3_600,
        request_timeout_seconds: 30,
    }
}

/// Test harness containing everything needed for HTTP endpoint tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The shared store, for seeding data directly.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = test_config(&temp_dir.path().to_string_lossy());
        let state = AppState::new(store.clone(), config).expect("Failed to build app state");
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
        }
    }
}
