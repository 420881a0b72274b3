//! Router tests for the collection and health endpoints.
//!
//! Requests go straight into the router with `tower::ServiceExt::oneshot`;
//! no listener is bound.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use schoolhub_server::{build_router, config::Config, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn app() -> Router {
    build_router(AppState::new(Config::default())).unwrap()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    call(app, Method::GET, uri, None, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, uri, Some(body), None).await
}

async fn create(app: &Router, collection: &str, fields: Value) -> String {
    let (status, body) = post(app, &format!("/api/{collection}"), fields).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[cfg(test)]
mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_find_update_delete() {
        let app = app();

        let (status, body) = post(&app, "/api/students", json!({"name": "Ana", "grade": 9})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Created students record");
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["name"], "Ana");
        assert_eq!(body["data"]["createdAt"], body["data"]["updatedAt"]);

        let (status, body) = get(&app, &format!("/api/students/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["grade"], 9);

        let (status, body) = call(
            &app,
            Method::PUT,
            &format!("/api/students/{id}"),
            Some(json!({"grade": 10, "id": "hijack"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["grade"], 10);
        assert_eq!(body["data"]["name"], "Ana");
        assert_eq!(body["data"]["id"], id.as_str());
        assert_eq!(body["message"], "Updated students record");

        let (status, body) =
            call(&app, Method::DELETE, &format!("/api/students/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = get(&app, &format!("/api/students/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not found"));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let app = app();
        create(&app, "students", json!({"name": "Ana"})).await;

        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/students/missing",
            Some(json!({"name": "X"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::DELETE, "/api/students/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = get(&app, "/api/students").await;
        assert_eq!(body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn test_non_object_payload_is_rejected() {
        let app = app();
        let (status, body) = post(&app, "/api/students", json!([1, 2])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("invalid payload"));
    }
}

#[cfg(test)]
mod query_tests {
    use super::*;

    async fn seeded() -> Router {
        let app = app();
        for i in 1..=15 {
            let grade = if i % 2 == 1 { 9 } else { 10 };
            create(
                &app,
                "students",
                json!({"name": format!("s{i:02}"), "grade": grade}),
            )
            .await;
        }
        app
    }

    fn names(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_default_pagination() {
        let app = seeded().await;
        let (status, body) = get(&app, "/api/students").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 10);
        assert_eq!(
            body["pagination"],
            json!({
                "page": 1,
                "limit": 10,
                "total": 15,
                "totalPages": 2,
                "hasNext": true,
                "hasPrev": false
            })
        );
    }

    #[tokio::test]
    async fn test_filter_sort_paginate() {
        let app = seeded().await;
        let (_, body) = get(
            &app,
            "/api/students?grade=9&sortBy=name&sortOrder=desc&page=1&limit=3",
        )
        .await;

        assert_eq!(names(&body), vec!["s15", "s13", "s11"]);
        assert_eq!(body["pagination"]["total"], 8);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["hasNext"], true);

        let (_, body) = get(
            &app,
            "/api/students?grade=9&sortBy=name&sortOrder=desc&page=3&limit=3",
        )
        .await;
        assert_eq!(names(&body), vec!["s03", "s01"]);
        assert_eq!(body["pagination"]["hasNext"], false);
        assert_eq!(body["pagination"]["hasPrev"], true);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let app = seeded().await;
        let (_, body) = get(&app, "/api/students?search=S0&limit=20").await;
        assert_eq!(body["pagination"]["total"], 9);
    }

    #[tokio::test]
    async fn test_comma_list_is_set_membership() {
        let app = seeded().await;
        let (_, body) = get(&app, "/api/students?grade=9,10").await;
        assert_eq!(body["pagination"]["total"], 15);

        let (_, body) = get(&app, "/api/students?name=s01,s02,nobody").await;
        assert_eq!(body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let app = app();
        let (status, body) = get(&app, "/api/ghosts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["total"], 0);
        assert_eq!(body["pagination"]["totalPages"], 0);
    }

    #[tokio::test]
    async fn test_bad_query_params() {
        let app = app();
        for uri in [
            "/api/students?page=abc",
            "/api/students?limit=-5",
            "/api/students?sortOrder=up",
        ] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], false);
        }
    }
}

#[cfg(test)]
mod bulk_tests {
    use super::*;

    #[tokio::test]
    async fn test_bulk_archive_reports_missing_ids() {
        let app = app();
        let a = create(&app, "students", json!({"name": "A"})).await;
        let b = create(&app, "students", json!({"name": "B"})).await;

        let (status, body) = post(
            &app,
            "/api/students/bulk",
            json!({"ids": [a, "missing", b], "operation": "archive"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["succeeded"], 2);
        assert_eq!(body["data"]["failed"], 1);
        assert_eq!(body["data"]["results"][1]["id"], "missing");
        assert_eq!(body["data"]["results"][1]["success"], false);
        assert_eq!(body["message"], "Bulk archive completed: 2 succeeded, 1 failed");

        let (_, body) = get(&app, &format!("/api/students/{a}")).await;
        assert_eq!(body["data"]["isActive"], false);

        let (_, body) = get(&app, "/api/students?isActive=false").await;
        assert_eq!(body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn test_bulk_update_requires_data() {
        let app = app();
        let a = create(&app, "students", json!({"name": "A"})).await;

        let (status, body) = post(
            &app,
            "/api/students/bulk",
            json!({"ids": [a], "operation": "update"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = post(
            &app,
            "/api/students/bulk",
            json!({"ids": [a], "operation": "update", "data": {"grade": 11}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["succeeded"], 1);
    }

    #[tokio::test]
    async fn test_bulk_delete() {
        let app = app();
        let a = create(&app, "students", json!({"name": "A"})).await;
        create(&app, "students", json!({"name": "B"})).await;

        let (_, body) = post(
            &app,
            "/api/students/bulk",
            json!({"ids": [a], "operation": "delete"}),
        )
        .await;
        assert_eq!(body["data"]["succeeded"], 1);

        let (_, body) = get(&app, "/api/students").await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["data"][0]["name"], "B");
    }
}

#[cfg(test)]
mod auth_tests {
    use super::*;

    fn secured() -> Router {
        build_router(AppState::new(Config::default().with_auth_token("s3cret"))).unwrap()
    }

    #[tokio::test]
    async fn test_token_required_when_configured() {
        let app = secured();

        let (status, body) = call(&app, Method::GET, "/api/students", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = call(&app, Method::GET, "/api/students", None, Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, Method::GET, "/api/students", None, Some("s3cret")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_rejected() {
        let app = app();
        let request = Request::builder()
            .uri("/api/students")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = secured();
        let (status, _) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app();
        create(&app, "students", json!({"name": "A"})).await;
        create(&app, "classes", json!({"name": "7b"})).await;

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get(&app, "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);
        assert_eq!(body["store"]["totalRecords"], 2);
        assert_eq!(body["store"]["collections"]["classes"], 1);

        let (status, body) = get(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);

        let (status, body) = get(&app, "/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alive"], true);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = app();
        create(&app, "students", json!({"name": "A"})).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("schoolhub_records_total 1"));
        assert!(text.contains("schoolhub_collection_records{collection=\"students\"} 1"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app();
        let (status, body) = get(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
