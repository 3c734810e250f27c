//! HTTP server for MCP over Streamable HTTP and legacy SSE transports.
//!
//! One process serves both protocol families. Streamable HTTP multiplexes a
//! conversation over `/mcp`, correlated by the `mcp-session-id` header; the
//! legacy family pairs a `GET /sse` push stream with `POST /messages`,
//! correlated by query parameter. Each family has its own session registry
//! and the two are never unified.

use axum::routing::{get, post};
use axum::Router;
use futures::future::join_all;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::{McpHandler, McpServer, PromptRegistry, ResourceRegistry};
use crate::metrics::Metrics;
use crate::session::{LegacySession, SessionRegistry, StreamableSession};

pub mod handlers;
pub mod security;

/// Header correlating Streamable HTTP requests to their session.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Shared server state, cheap to clone into each handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    resources: Arc<ResourceRegistry>,
    streaming: Arc<SessionRegistry<StreamableSession>>,
    legacy: Arc<SessionRegistry<LegacySession>>,
}

impl AppState {
    /// Build state with empty registries over shared handler registries.
    pub fn new(
        config: Config,
        metrics: Arc<Metrics>,
        handler: Arc<McpHandler>,
        prompts: Arc<PromptRegistry>,
        resources: Arc<ResourceRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            metrics,
            handler,
            prompts,
            resources,
            streaming: Arc::new(SessionRegistry::new()),
            legacy: Arc::new(SessionRegistry::new()),
        }
    }

    /// A server instance for a new session, over the shared registries.
    pub fn new_server(&self) -> McpServer {
        McpServer::new(
            self.handler.clone(),
            self.prompts.clone(),
            self.resources.clone(),
            crate::SERVER_NAME,
            crate::VERSION,
        )
    }
}

/// Build the router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/mcp",
            post(handlers::post_mcp)
                .get(handlers::get_mcp)
                .delete(handlers::delete_mcp),
        )
        .route("/sse", get(handlers::get_sse))
        .route("/messages", post(handlers::post_message))
        .layer(security::cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server and block until shutdown completes.
pub async fn start_server(
    config: Config,
    metrics: Arc<Metrics>,
    handler: Arc<McpHandler>,
    prompts: Arc<PromptRegistry>,
    resources: Arc<ResourceRegistry>,
) -> Result<()> {
    let port = config.port;
    let state = AppState::new(config, metrics, handler, prompts, resources);
    let app = build_router(state.clone());

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| crate::error::Error::HttpServer(format!("failed to bind {}: {}", addr, e)))?;

    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            drain_sessions(&shutdown_state).await;
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

/// Close every live session in both registries, concurrently.
async fn drain_sessions(state: &AppState) {
    let streaming = state.streaming.drain();
    let legacy = state.legacy.drain();

    if streaming.is_empty() && legacy.is_empty() {
        return;
    }

    info!(
        streaming = streaming.len(),
        legacy = legacy.len(),
        "closing sessions"
    );

    tokio::join!(
        join_all(streaming.iter().map(|(_, session)| session.close())),
        join_all(legacy.iter().map(|(_, session)| session.close())),
    );

    for _ in &streaming {
        state.metrics.inc_sessions_closed();
    }
    for _ in &legacy {
        state.metrics.inc_legacy_closed();
    }

    info!(metrics = ?state.metrics.snapshot(), "final session metrics");
}
