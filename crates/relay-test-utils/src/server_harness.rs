//! Test server harness for E2E testing
//!
//! Provides `TestRelayServer` for spawning real relay instances in tests.

use relay_service::config::Config;
use relay_service::repositories::{CallHistoryRepository, MailboxRepository};
use relay_service::routes::{self, AppState};
use relay_service::tasks;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Test harness for spawning the signaling relay in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_poll_is_destructive() -> Result<(), anyhow::Error> {
///     let server = TestRelayServer::spawn().await?;
///     let client = reqwest::Client::new();
///
///     let response = client
///         .get(format!("{}/signal?username=bob", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRelayServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    cancel_token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestRelayServer {
    /// Spawn a new test relay with default configuration.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server and the stale-signal sweeper in the
    ///   background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn a new test relay with configuration overrides.
    ///
    /// # Arguments
    /// * `vars` - Environment-style overrides (e.g. `SIGNAL_TTL_SECONDS`)
    pub async fn spawn_with_vars(mut vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        vars.entry("BIND_ADDRESS".to_string())
            .or_insert_with(|| "127.0.0.1:0".to_string());
        vars.entry("RELAY_ID".to_string())
            .or_insert_with(|| "relay-test".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        // Build a standalone (non-installed) recorder so multiple test
        // servers can coexist in one process.
        let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();

        let signal_ttl = Duration::from_secs(config.signal_ttl_seconds);
        let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);

        let state = Arc::new(AppState {
            mailboxes: Arc::new(MailboxRepository::new()),
            history: Arc::new(CallHistoryRepository::new()),
            config,
            metrics_handle,
        });

        let cancel_token = CancellationToken::new();
        tokio::spawn(tasks::run_signal_sweeper(
            Arc::clone(&state.mailboxes),
            signal_ttl,
            sweep_interval,
            cancel_token.clone(),
        ));

        // Build routes using the relay's real route builder
        let app = routes::build_routes(Arc::clone(&state));

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
            state,
            cancel_token,
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

    /// Direct access to the mailbox store, for white-box assertions.
    pub fn mailboxes(&self) -> &Arc<MailboxRepository> {
        &self.state.mailboxes
    }

    /// Direct access to the history store, for white-box assertions.
    pub fn history(&self) -> &Arc<CallHistoryRepository> {
        &self.state.history
    }
}

impl Drop for TestRelayServer {
    fn drop(&mut self) {
        // Stop the sweeper and abort the HTTP server task so cleanup is
        // immediate when the test completes.
        self.cancel_token.cancel();
        self._handle.abort();
    }
}
