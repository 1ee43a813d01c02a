//! Test server harness for E2E testing
//!
//! Provides `TestTaskServer` for spawning real task service instances in tests.

use crate::crypto_fixtures::SERVICE_KEY_PKCS1_PEM;
use crate::test_ids::{TEST_ASSERTION_TYPE, TEST_ISSUER, TEST_TOKEN_LIFETIME_SECS};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use task_service::auth::ServiceKeyPair;
use task_service::config::Config;
use task_service::db;
use task_service::models::TokenResponse;
use task_service::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Test harness for spawning the task service in E2E tests.
///
/// Each instance owns a fresh in-memory SQLite database and signs tokens
/// with [`SERVICE_KEY_PKCS1_PEM`].
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<()> {
///     let server = TestTaskServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTaskServer {
    addr: SocketAddr,
    pool: SqlitePool,
    config: Config,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestTaskServer {
    /// Spawn a server that trusts [`TEST_ISSUER`].
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_issuer(TEST_ISSUER).await
    }

    /// Spawn a server that trusts `issuer` for assertions and uses it as the
    /// access-token `iss`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Apply migrations to an in-memory database
    /// - Start the HTTP server in the background
    pub async fn spawn_with_issuer(issuer: &str) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([
            ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "JWT_PRIVATE_KEY".to_string(),
                SERVICE_KEY_PKCS1_PEM.to_string(),
            ),
            ("JWT_ISSUER".to_string(), issuer.to_string()),
            (
                "JWT_TOKEN_EXPIRY".to_string(),
                format!("{TEST_TOKEN_LIFETIME_SECS}s"),
            ),
        ]);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let keys = ServiceKeyPair::from_pem(SERVICE_KEY_PKCS1_PEM.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to load service key: {}", e))?;

        let pool = db::create_pool(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;
        db::run_migrations(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

        let state = Arc::new(AppState::new(pool.clone(), config.clone(), Arc::new(keys)));

        // Recorder is not installed globally, so parallel tests never collide.
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            pool,
            config,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get reference to the database pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
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

    /// Shared HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a client-credentials form to `/token`.
    pub async fn request_token(
        &self,
        assertion: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/token", self.url()))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_assertion", assertion),
                ("client_assertion_type", TEST_ASSERTION_TYPE),
            ])
            .send()
            .await?;
        Ok(response)
    }

    /// Exchange `assertion` for an access token, failing on any non-200.
    pub async fn exchange_assertion(&self, assertion: &str) -> Result<String, anyhow::Error> {
        let response = self.request_token(assertion).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("token request failed with {status}: {body}");
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

impl Drop for TestTaskServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
