//! HTTP route definitions.

mod collections;
mod health;
mod ws;

use axum::Router;

use crate::error::AppError;
use crate::AppState;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(collections::routes())
        .merge(ws::routes())
        .fallback(not_found)
}

async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
