//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::DeployError;
use crate::server::handlers::{backend_handler, frontend_handler, health_handler};
use crate::server::state::ServerState;

/// Build the application router
pub fn app(state: Arc<ServerState>) -> Router {
    Router::new()
        // Deploy routes
        .route("/backend", post(backend_handler))
        .route("/frontend", post(frontend_handler))
        // Health
        .route("/health", get(health_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    port: u16,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeployError>>, DeployError> {
    let router = app(state);

    let addr = format!("0.0.0.0:{}", port);
    info!("Starting deploy webhook server on {}", addr);
    info!("Routes: POST /backend, POST /frontend, GET /health");

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::ServerError(e.to_string()))
    });

    Ok(handle)
}
