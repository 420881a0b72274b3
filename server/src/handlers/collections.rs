//! Collection handlers: the query engine over HTTP.
//!
//! Every successful mutation is announced to WebSocket clients as a
//! `data_changed` message after the store lock is released.

use std::collections::HashMap;

use schoolhub_engine::{BulkReport, BulkRequest, Envelope, QueryOptions, Record, SortOrder};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::websocket::{data_changed, ChangeAction};
use crate::AppState;

/// Query parameters with a fixed meaning; everything else is a filter.
const RESERVED_PARAMS: [&str; 5] = ["page", "limit", "search", "sortBy", "sortOrder"];

/// Build [`QueryOptions`] from list query parameters.
///
/// `page`, `limit`, `search`, `sortBy` and `sortOrder` are read as such.
/// Any other parameter is an equality filter; `true`/`false` and numbers
/// are parsed, and a comma-separated value becomes set membership.
pub fn parse_list_query(params: HashMap<String, String>) -> Result<QueryOptions> {
    let mut options = QueryOptions::new();

    if let Some(page) = params.get("page") {
        options.page = Some(parse_count("page", page)?);
    }
    if let Some(limit) = params.get("limit") {
        options.limit = Some(parse_count("limit", limit)?);
    }
    if let Some(search) = params.get("search") {
        options.search = Some(search.clone());
    }
    if let Some(sort_by) = params.get("sortBy").filter(|s| !s.is_empty()) {
        options.sort_by = Some(sort_by.clone());
    }
    if let Some(order) = params.get("sortOrder") {
        options.sort_order = match order.to_ascii_lowercase().as_str() {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            other => {
                return Err(AppError::BadRequest(format!(
                    "sortOrder must be asc or desc, got {other:?}"
                )))
            }
        };
    }

    for (field, raw) in params {
        if RESERVED_PARAMS.contains(&field.as_str()) {
            continue;
        }
        let value = if raw.contains(',') {
            Value::Array(raw.split(',').map(|part| parse_scalar(part.trim())).collect())
        } else {
            parse_scalar(&raw)
        };
        options.filters.insert(field, value);
    }

    Ok(options)
}

fn parse_count(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{name} must be a non-negative integer")))
}

fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::from(n)
            } else if let Some(n) = raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .and_then(serde_json::Number::from_f64)
            {
                Value::Number(n)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

/// List records matching the query.
pub async fn list_records(
    state: &AppState,
    collection: &str,
    options: &QueryOptions,
) -> Envelope<Vec<Record>> {
    let store = state.store.read().await;
    let result = store.find_many(collection, options);
    Envelope::ok(result.records).with_pagination(result.pagination)
}

/// Create a record.
pub async fn create_record(
    state: &AppState,
    collection: &str,
    fields: Value,
) -> Result<Envelope<Record>> {
    let record = state.store.write().await.create(collection, fields)?;

    tracing::info!(collection = %collection, id = %record.id, "Record created");
    announce(state, collection, ChangeAction::Created, &record.id);

    Ok(Envelope::created(collection, record))
}

/// Fetch a record by id.
pub async fn get_record(state: &AppState, collection: &str, id: &str) -> Result<Envelope<Record>> {
    let store = state.store.read().await;
    let record = store.get(collection, id)?.clone();
    Ok(Envelope::ok(record))
}

/// Shallow-merge `partial` into a record.
pub async fn update_record(
    state: &AppState,
    collection: &str,
    id: &str,
    partial: Value,
) -> Result<Envelope<Record>> {
    let record = state.store.write().await.update(collection, id, partial)?;

    tracing::info!(collection = %collection, id = %id, "Record updated");
    announce(state, collection, ChangeAction::Updated, id);

    Ok(Envelope::updated(collection, record))
}

/// Delete a record, returning it.
pub async fn delete_record(
    state: &AppState,
    collection: &str,
    id: &str,
) -> Result<Envelope<Record>> {
    let record = state.store.write().await.delete(collection, id)?;

    tracing::info!(collection = %collection, id = %id, "Record deleted");
    announce(state, collection, ChangeAction::Deleted, id);

    Ok(Envelope::deleted(collection, record))
}

/// Apply a bulk request. Missing ids are reported per item.
pub async fn bulk_records(
    state: &AppState,
    collection: &str,
    request: &BulkRequest,
) -> Result<Envelope<BulkReport>> {
    let report = state.store.write().await.bulk(collection, request)?;

    tracing::info!(
        collection = %collection,
        operation = %request.operation,
        succeeded = report.succeeded,
        failed = report.failed,
        "Bulk operation applied"
    );

    let action = ChangeAction::from(request.operation);
    for id in report.succeeded_ids() {
        announce(state, collection, action, id);
    }

    Ok(Envelope::bulk_completed(request.operation, report))
}

fn announce(state: &AppState, collection: &str, action: ChangeAction, id: &str) {
    let sent = state
        .conn_manager
        .broadcast_all(&data_changed(collection, action, id));
    tracing::debug!(collection = %collection, id = %id, recipients = sent, "Announced data change");
}
