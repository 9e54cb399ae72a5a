//! Web server module - JSON API over the dashboard

pub mod http;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dashboard::Dashboard;

/// Shared server state
#[derive(Clone)]
pub struct ServerState {
    pub dashboard: Arc<Dashboard>,
}

/// Build the API router
pub fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(http::health_handler))
        .route("/api/students/{id}", get(http::student_handler))
        .route("/api/students/{id}/content", get(http::content_handler))
        .route("/api/students/{id}/levels/{concept}", put(http::update_level_handler))
        .route("/api/ingest", post(http::ingest_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server
pub async fn start(host: &str, port: u16, dashboard: Arc<Dashboard>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    dashboard.log_summary().await;
    let app = router(ServerState { dashboard });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    println!("Flipped tutor listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
