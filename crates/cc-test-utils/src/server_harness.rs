//! Test server harness for E2E testing
//!
//! Provides `TestCcServer` for spawning real Call Controller server
//! instances in tests, with the call record store and push client injected
//! so tests run against in-memory fakes.

use cc_service::config::Config;
use cc_service::observability::metrics::init_metrics_recorder;
use cc_service::repositories::CallStore;
use cc_service::routes::{self, AppState};
use cc_service::services::PushClient;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle shared by all test servers in a process.
///
/// The Prometheus recorder can only be installed once per process; later
/// spawns reuse the handle (or an unregistered recorder as fallback).
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Test harness for spawning Call Controller server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let store = Arc::new(MockCallStore::with_ringing_call("u1", "c1"));
/// let push = Arc::new(MockPushClient::delivering());
/// let server = TestCcServer::spawn(store, push).await?;
///
/// let response = reqwest::Client::new()
///     .post(&format!("{}/acceptCall", server.url()))
///     .json(&body)
///     .send()
///     .await?;
/// ```
pub struct TestCcServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestCcServer {
    /// Spawn a new test server instance with the given store and push
    /// client.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn(
        store: Arc<dyn CallStore>,
        push: Arc<dyn PushClient>,
    ) -> Result<Self, anyhow::Error> {
        // Build configuration for test environment
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("FCM_PROJECT_ID".to_string(), "test-project".to_string()),
            (
                "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                "/dev/null".to_string(),
            ),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState {
            config: config.clone(),
            store,
            push,
        });

        // Build routes using the real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestCcServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so cleanup is immediate when the test
        // completes.
        self._handle.abort();
    }
}
