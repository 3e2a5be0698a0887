//! Cachegrid Server - live grid projection of a record feed.
//!
//! Feeds stream framed change-sets over WebSocket; the server keeps a
//! normalized projection with the cachegrid-engine and serves it to
//! dashboards over HTTP and WebSocket.

mod auth;
mod config;
mod error;
mod handlers;
mod projection;
mod routes;
mod websocket;

use crate::config::Config;
use crate::projection::Projection;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub projection: Projection,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Spawn the projection writer and dashboard publisher.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: Config) -> Self {
        let projection = Projection::spawn(config.command_buffer);
        let conn_manager = ConnectionManager::new_shared();

        tokio::spawn(handlers::run_publisher(
            projection.clone(),
            Arc::clone(&conn_manager),
        ));

        Self {
            config: Arc::new(config),
            projection,
            conn_manager,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before reading RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cachegrid_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Cachegrid Server on {}:{}", config.host, config.port);
    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set; feed and write endpoints are open");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config);

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
