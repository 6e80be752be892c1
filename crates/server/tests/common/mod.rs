//! Common test utilities for E2E testing with mocks.
//!
//! Builds the real router around a dispatcher wired to mock collaborators,
//! an in-memory user store and a recording telemetry sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tower::ServiceExt;

use mediarelay_core::{
    create_authenticator,
    media::FallbackDecoder,
    testing::{MockFetcher, MockLinkResolver, MockProber, MockTranscoder},
    AnalyticsKind, AuthMethod, Dispatcher, DispatcherServices, FallbackChain, SqliteUserStore,
    Telemetry,
};
use mediarelay_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use mediarelay_core::testing::fixtures;

/// Telemetry sink that keeps every event.
#[derive(Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<(AnalyticsKind, i64, String)>>,
}

impl RecordingTelemetry {
    pub async fn events(&self) -> Vec<(AnalyticsKind, i64, String)> {
        self.events.lock().await.clone()
    }

    /// Waits for spawned track calls to land.
    pub async fn wait_for(&self, count: usize) -> Vec<(AnalyticsKind, i64, String)> {
        for _ in 0..100 {
            let events = self.events().await;
            if events.len() >= count {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.events().await
    }
}

#[async_trait]
impl Telemetry for RecordingTelemetry {
    async fn track(&self, kind: AnalyticsKind, user_id: i64, data: &str) {
        self.events.lock().await.push((kind, user_id, data.to_string()));
    }
}

/// Test fixture for E2E testing with mock dependencies.
pub struct TestFixture {
    pub router: Router,
    pub prober: Arc<MockProber>,
    pub transcoder: Arc<MockTranscoder>,
    pub resolver: Arc<MockLinkResolver>,
    pub fetcher: Arc<MockFetcher>,
    pub telemetry: Arc<RecordingTelemetry>,
    /// Holds the staging directory
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Transport key; `None` disables authentication
    pub api_key: Option<String>,
    pub admin_api_key: Option<String>,
}

impl TestConfig {
    pub fn with_keys(api_key: &str, admin_api_key: Option<&str>) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            admin_api_key: admin_api_key.map(str::to_string),
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::build(TestConfig::default(), Vec::new())
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        Self::build(test_config, Vec::new())
    }

    pub async fn with_decoders(decoders: Vec<Arc<dyn FallbackDecoder>>) -> Self {
        Self::build(TestConfig::default(), decoders)
    }

    fn build(test_config: TestConfig, decoders: Vec<Arc<dyn FallbackDecoder>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = fixtures::test_config();
        config.converter.temp_dir = temp_dir.path().join("staging");
        if let Some(api_key) = test_config.api_key {
            config.auth.method = AuthMethod::ApiKey;
            config.auth.api_key = Some(api_key);
            config.auth.admin_api_key = test_config.admin_api_key;
        }

        let prober = Arc::new(MockProber::new());
        let transcoder = Arc::new(MockTranscoder::new());
        let resolver = Arc::new(MockLinkResolver::new());
        let fetcher = Arc::new(MockFetcher::new());
        let telemetry = Arc::new(RecordingTelemetry::default());

        let dispatcher = Dispatcher::new(
            &config,
            DispatcherServices {
                prober: prober.clone(),
                transcoder: transcoder.clone(),
                resolver: resolver.clone(),
                fetcher: fetcher.clone(),
                fallback: FallbackChain::new(decoders),
            },
        );

        let authenticator =
            Arc::from(create_authenticator(&config.auth).expect("Failed to create authenticator"));

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Arc::new(dispatcher),
            Arc::new(SqliteUserStore::in_memory().expect("Failed to create user store")),
            telemetry.clone(),
        ));

        Self {
            router: create_router(state),
            prober,
            transcoder,
            resolver,
            fetcher,
            telemetry,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a GET request with a bearer token.
    pub async fn get_with_key(&self, path: &str, key: &str) -> TestResponse {
        self.request("GET", path, None, Some(key)).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// Send a POST request with JSON body and a bearer token.
    pub async fn post_with_key(&self, path: &str, body: Value, key: &str) -> TestResponse {
        self.request("POST", path, Some(body), Some(key)).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        key: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some(key) = key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", key));
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}
