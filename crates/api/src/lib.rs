//! `api` crate — HTTP trigger surface for export runs.
//!
//! Exposes:
//!   GET    /                         liveness
//!   POST   /api/{profile}/export     run one export profile

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use engine::{AppConfig, ExportOrchestrator, ProfileRegistry};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ExportOrchestrator>,
    pub config: Arc<AppConfig>,
    pub profiles: Arc<ProfileRegistry>,
}

impl AppState {
    pub fn new(orchestrator: ExportOrchestrator, config: AppConfig, profiles: ProfileRegistry) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
            profiles: Arc::new(profiles),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health))
        .route("/api/:profile/export", post(handlers::exports::trigger))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
