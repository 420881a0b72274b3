//! Health check endpoints.

use std::fmt::Write;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use schoolhub_engine::StoreStats;
use serde::Serialize;

use crate::AppState;

/// How long readiness waits for the store lock.
const READY_TIMEOUT: Duration = Duration::from_secs(1);

/// Health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Component health status.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub name: &'static str,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Detailed health report.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealth {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: usize,
    pub components: Vec<ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreStats>,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/health/detailed", get(detailed))
        .route("/health/ready", get(ready))
        .route("/health/live", get(live))
        .route("/health/metrics", get(metrics))
}

/// Health check handler.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Per-component report. A store held by a writer is reported as degraded
/// rather than waited on.
async fn detailed(State(state): State<AppState>) -> Json<DetailedHealth> {
    let (store_health, stats) = match state.store.try_read() {
        Ok(store) => (
            ComponentHealth {
                name: "store",
                status: HealthStatus::Healthy,
                message: None,
            },
            Some(store.stats()),
        ),
        Err(_) => (
            ComponentHealth {
                name: "store",
                status: HealthStatus::Degraded,
                message: Some("store is busy".to_string()),
            },
            None,
        ),
    };

    let connections = state.conn_manager.connection_count();
    let realtime_health = ComponentHealth {
        name: "realtime",
        status: HealthStatus::Healthy,
        message: Some(format!("{connections} active connections")),
    };

    let components = vec![store_health, realtime_health];
    let status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    Json(DetailedHealth {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        connections,
        components,
        store: stats,
    })
}

/// Readiness: the store can be read within [`READY_TIMEOUT`].
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::time::timeout(READY_TIMEOUT, state.store.read()).await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({"ready": true}))),
        Err(_) => {
            tracing::warn!("Readiness check timed out waiting for the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"ready": false})),
            )
        }
    }
}

/// Liveness: the process answers.
async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({"alive": true}))
}

/// Prometheus text exposition of connection and record counts.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.read().await.stats();
    let body = render_metrics(
        &stats,
        state.conn_manager.connection_count(),
        state.started_at.elapsed().as_secs(),
    );
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

fn render_metrics(stats: &StoreStats, connections: usize, uptime_seconds: u64) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "# TYPE schoolhub_uptime_seconds gauge");
    let _ = writeln!(out, "schoolhub_uptime_seconds {uptime_seconds}");
    let _ = writeln!(out, "# TYPE schoolhub_ws_connections gauge");
    let _ = writeln!(out, "schoolhub_ws_connections {connections}");
    let _ = writeln!(out, "# TYPE schoolhub_records_total gauge");
    let _ = writeln!(out, "schoolhub_records_total {}", stats.total_records);
    let _ = writeln!(out, "# TYPE schoolhub_collection_records gauge");
    for (name, count) in &stats.collections {
        let _ = writeln!(
            out,
            "schoolhub_collection_records{{collection=\"{}\"}} {count}",
            name.replace('\\', "\\\\").replace('"', "\\\"")
        );
    }
    out
}

/// Root handler.
async fn root() -> &'static str {
    "SchoolHub Server"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_metrics() {
        let stats = StoreStats {
            collections: BTreeMap::from([
                ("classes".to_string(), 2),
                ("students".to_string(), 5),
            ]),
            total_records: 7,
        };

        let text = render_metrics(&stats, 3, 42);
        assert!(text.contains("schoolhub_uptime_seconds 42\n"));
        assert!(text.contains("schoolhub_ws_connections 3\n"));
        assert!(text.contains("schoolhub_records_total 7\n"));
        assert!(text.contains("schoolhub_collection_records{collection=\"classes\"} 2\n"));
        assert!(text.contains("schoolhub_collection_records{collection=\"students\"} 5\n"));
    }

    #[test]
    fn test_label_escaping() {
        let stats = StoreStats {
            collections: BTreeMap::from([("we\"ird".to_string(), 1)]),
            total_records: 1,
        };
        let text = render_metrics(&stats, 0, 0);
        assert!(text.contains(r#"collection="we\"ird""#));
    }
}
