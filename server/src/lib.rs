//! SchoolHub Server - collection API and realtime relay.
//!
//! Serves the collection query engine over HTTP and relays realtime
//! messages between WebSocket clients, announcing every record change as a
//! `data_changed` message.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod websocket;

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::Router;
use schoolhub_engine::Store;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ConfigError};
use crate::websocket::ConnectionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Store::new())
    }

    pub fn with_store(config: Config, store: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
            started_at: Instant::now(),
        }
    }
}

/// Build the application router with tracing and CORS layers.
pub fn build_router(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.config.allowed_origins)?;

    Ok(Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layer.allow_origin(AllowOrigin::list(origins)))
}
