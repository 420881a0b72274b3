//! Collection endpoint routes.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use schoolhub_engine::{BulkReport, BulkRequest, Envelope, Record};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    bulk_records, create_record, delete_record, get_record, list_records, parse_list_query,
    update_record,
};
use crate::AppState;

/// Create collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/{collection}", get(list_handler).post(create_handler))
        .route("/api/{collection}/bulk", post(bulk_handler))
        .route(
            "/api/{collection}/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
}

/// GET /api/{collection} - Filter, search, sort and paginate.
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<Vec<Record>>>> {
    let options = parse_list_query(params)?;
    Ok(Json(list_records(&state, &collection, &options).await))
}

/// POST /api/{collection} - Create a record.
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(fields): Json<Value>,
) -> Result<(StatusCode, Json<Envelope<Record>>)> {
    let envelope = create_record(&state, &collection, fields).await?;
    Ok((StatusCode::CREATED, Json(envelope)))
}

/// GET /api/{collection}/{id} - Fetch one record.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Envelope<Record>>> {
    Ok(Json(get_record(&state, &collection, &id).await?))
}

/// PUT /api/{collection}/{id} - Shallow-merge fields into a record.
async fn update_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
    Json(partial): Json<Value>,
) -> Result<Json<Envelope<Record>>> {
    Ok(Json(update_record(&state, &collection, &id, partial).await?))
}

/// DELETE /api/{collection}/{id} - Remove a record.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Envelope<Record>>> {
    Ok(Json(delete_record(&state, &collection, &id).await?))
}

/// POST /api/{collection}/bulk - Apply one operation to many ids.
async fn bulk_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(collection): Path<String>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<Envelope<BulkReport>>> {
    Ok(Json(bulk_records(&state, &collection, &request).await?))
}
