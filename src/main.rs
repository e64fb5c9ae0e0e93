//! sync-ws-gateway server entry point.
//!
//! Serves the counter sync route plus the REST system endpoints.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sync_ws_gateway::api;
use sync_ws_gateway::app_state::AppState;
use sync_ws_gateway::config::GatewayConfig;
use sync_ws_gateway::domain::ConnectionRegistry;
use sync_ws_gateway::engine::{Counter, CounterEngine};
use sync_ws_gateway::ws::{SyncRoute, UpgradeContext, from_fn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, path = %config.sync_path, "starting sync-ws-gateway");

    let registry = Arc::new(ConnectionRegistry::new());
    let app_state = AppState {
        registry: Arc::clone(&registry),
    };

    // Build the sync route
    let initial = config.initial_counter;
    let mut sync_route = SyncRoute::new(
        &config.sync_path,
        from_fn(move |_: &UpgradeContext| Counter::new(initial)),
        CounterEngine::new(),
    )
    .registry(registry);
    if let Some(bytes) = config.max_frame_size {
        sync_route = sync_route.max_frame_size(bytes);
    }
    if let Some(bytes) = config.max_message_size {
        sync_route = sync_route.max_message_size(bytes);
    }

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .merge(sync_route.into_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
