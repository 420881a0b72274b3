//! WebSocket upgrade route.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::auth::authorize_token;
use crate::error::Result;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// GET /ws?token=... - Upgrade to the realtime relay.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response> {
    authorize_token(&state.config, query.token.as_deref())?;

    let conn_manager = state.conn_manager.clone();
    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, conn_manager)))
}
