//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Wire up middleware (request ID, access log, timeout, tracing)
//! - Bind server to listener
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Path,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::extra::ExtraLogs;
use crate::http::middleware::{access_log_middleware, AccessLogger};
use crate::rules::RuleError;

/// Demo HTTP server with the access log middleware mounted.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server that logs through `tracing`.
    pub fn new(config: AppConfig) -> Result<Self, RuleError> {
        let logger = AccessLogger::new(config.access_log.clone())?;
        Ok(Self::with_logger(config, Arc::new(logger)))
    }

    /// Create a server around an already built logger.
    pub fn with_logger(config: AppConfig, logger: Arc<AccessLogger>) -> Self {
        let router = Self::build_router(&config, logger);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Outermost first: trace, set request ID, propagate request ID, access
    /// log, timeout. Timed-out requests are therefore still logged (408).
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, logger: Arc<AccessLogger>) -> Router {
        Router::new()
            .route("/", get(index))
            .route("/healthz", get(healthz))
            .route("/echo", post(echo))
            .route("/status/{code}", any(status))
            .route("/annotated", get(annotated))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(middleware::from_fn_with_state(logger, access_log_middleware))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// A copy of the router, for serving it elsewhere or driving it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn index() -> &'static str {
    "access-logger demo"
}

async fn healthz() -> &'static str {
    "ok"
}

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, status.canonical_reason().unwrap_or("")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "Invalid status code").into_response(),
    }
}

async fn annotated(extra: ExtraLogs) -> &'static str {
    extra.insert("user_id", 42);
    extra.insert("feature", "annotated");
    "annotated"
}
