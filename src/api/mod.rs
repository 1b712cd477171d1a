// src/api/mod.rs — Lightweight HTTP API server over the question engine

pub mod auth;
pub mod handlers;
pub mod types;

use axum::routing::{get, post};
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use crate::core::orchestrator::Orchestrator;
use crate::infra::config::ApiConfig;
use crate::memory::store::Store;
use crate::tools::ToolRegistry;
pub use types::AskRequest;

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Orchestrator>,
    pub registry: Arc<ToolRegistry>,
    /// Run-history store, shared with the engine's persistence hook.
    pub store: Option<Arc<Mutex<Store>>>,
    pub token: Option<String>,
}

/// Assemble the versioned route tree.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/v1/ask", post(handlers::ask))
        .route("/api/v1/tools", get(handlers::list_tools))
        .route("/api/v1/runs", get(handlers::list_runs))
        .route("/api/v1/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the configured address (blocking).
pub async fn start_server(config: &ApiConfig, state: ApiState) -> anyhow::Result<()> {
    let addr = config.listen.clone();
    let router = build_router(state);

    tracing::info!("serving API on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
