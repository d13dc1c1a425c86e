//! Bridge agent: the HTTP endpoint that runs inside the private network next to the ERP.
//!
//! One authenticated route, `POST /query-erp`, plus an unauthenticated `GET /health`. The
//! secret check is a route middleware, so it runs before the request body is even parsed.

mod auth;
mod handler;
mod response;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{BridgeConfig, DEFAULT_QUERY_TIMEOUT, QUERY_PATH, Secret};
use crate::connector::ErpConnector;
use crate::error::RelayError;

pub use response::ErrorBody;

/// Shared, read-only state of a running bridge.
pub struct BridgeState {
    pub(crate) secret: Secret,
    pub(crate) connector: Arc<dyn ErpConnector>,
    /// Upper bound for connect plus query of one request.
    pub(crate) query_timeout: Duration,
}

impl BridgeState {
    pub fn new(secret: Secret, connector: Arc<dyn ErpConnector>) -> Self {
        Self {
            secret,
            connector,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

/// Build the bridge router.
pub fn create_router(state: Arc<BridgeState>) -> Router {
    let guarded = Router::new()
        .route(QUERY_PATH, post(handler::handle_query))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_secret,
        ));

    Router::new()
        .merge(guarded)
        .route("/health", get(handler::handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP server for the bridge agent.
pub struct BridgeServer {
    config: BridgeConfig,
    state: Arc<BridgeState>,
}

impl BridgeServer {
    /// # Errors
    /// Returns `RelayError::Config` if the configuration is unusable.
    pub fn new(config: BridgeConfig, connector: Arc<dyn ErpConnector>) -> Result<Self, RelayError> {
        if config.erp_connection_string.is_empty() {
            warn!("ERP_ODBC_CONNECTION_STRING is empty; every query will fail to connect");
        }
        config.validate()?;
        let state = Arc::new(
            BridgeState::new(config.secret.clone(), connector)
                .with_query_timeout(config.query_timeout),
        );
        Ok(Self { config, state })
    }

    /// Serve until ctrl-c.
    ///
    /// # Errors
    /// Returns `RelayError::Config` if the address cannot be bound, or `RelayError::Transport`
    /// if the server stops with an I/O error.
    pub async fn run(self) -> Result<(), RelayError> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                RelayError::Config(format!("failed to bind {}: {e}", self.config.bind_addr))
            })?;
        self.run_on(listener).await
    }

    /// Serve on an already bound listener until ctrl-c.
    ///
    /// # Errors
    /// Returns `RelayError::Transport` if the server stops with an I/O error.
    pub async fn run_on(self, listener: tokio::net::TcpListener) -> Result<(), RelayError> {
        let local = listener
            .local_addr()
            .map_or_else(|_| self.config.bind_addr.to_string(), |a| a.to_string());
        info!(
            addr = %local,
            backend = self.state.connector.backend(),
            "ERP bridge listening"
        );

        let app = create_router(self.state);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| RelayError::Transport(format!("bridge server stopped: {e}")))?;

        info!("ERP bridge stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; bridge will run until killed");
        std::future::pending::<()>().await;
    }
}
