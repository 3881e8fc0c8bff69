//! HTTP front end
//!
//! | Method | Path              | Body                          |
//! |--------|-------------------|-------------------------------|
//! | GET    | `/api/v1/health`  |                               |
//! | POST   | `/api/v1/chatbot` | `{"query", "session_id"?}`    |

mod error;
mod routes;

pub use error::ApiError;
pub use routes::{ChatRequest, ChatResponse, SourceRef, SESSION_HEADER};

use crate::chat::ChatEngine;
use crate::error::Result;
use crate::session::{SessionLimits, SessionRegistry};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn ChatEngine>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(engine: Arc<dyn ChatEngine>, limits: SessionLimits) -> Self {
        Self {
            engine,
            sessions: SessionRegistry::with_limits(limits),
        }
    }
}

/// Any origin, method and header, with credentials
///
/// Wildcards cannot be combined with credentials, so the request values are mirrored.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health))
        .route("/api/v1/chatbot", post(routes::chatbot))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
