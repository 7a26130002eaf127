//! End-to-end exercise of the HTTP/JSON adapter (spec.md §1's "HTTP adapter
//! (collaborator)"): insert, get, update, paginate, and index through the
//! same router `HttpServer` mounts in production, without a real socket.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ledgerdb::config::EngineConfig;
use ledgerdb::engine::Engine;
use ledgerdb::http_server::{HttpServer, HttpServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

fn router(dir: &TempDir) -> axum::Router {
    let engine = Engine::open(EngineConfig {
        wal_dir: dir.path().join("wal"),
        data_dir: dir.path().join("data"),
        checkpoint_dir: dir.path().join("checkpoints"),
        ..EngineConfig::default()
    })
    .unwrap();
    HttpServer::new(engine, HttpServerConfig::default()).router()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let dir = TempDir::new().unwrap();
    let response = router(&dir).oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn insert_then_get_round_trips_over_http() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let insert_request = Request::post("/collections/users/documents")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "Alice", "age": 30}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(insert_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let inserted = body_json(response).await;
    let id = inserted["_id"].as_str().unwrap().to_string();

    let get_request = Request::get(format!("/collections/users/documents/{id}")).body(Body::empty()).unwrap();
    let response = app.oneshot(get_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched, inserted);
}

#[tokio::test]
async fn get_missing_document_returns_404_with_error_body() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let response = app
        .oneshot(Request::get("/collections/users/documents/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn create_index_then_find_filters_by_field() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    for (id, age, city) in [("1", 25, "Boston"), ("2", 25, "NYC"), ("3", 30, "Boston")] {
        let request = Request::post("/collections/users/documents")
            .header("content-type", "application/json")
            .body(Body::from(json!({"_id": id, "age": age, "city": city}).to_string()))
            .unwrap();
        assert_eq!(app.clone().oneshot(request).await.unwrap().status(), StatusCode::CREATED);
    }

    let index_request = Request::post("/collections/users/indexes")
        .header("content-type", "application/json")
        .body(Body::from(json!({"field": "age"}).to_string()))
        .unwrap();
    assert_eq!(app.clone().oneshot(index_request).await.unwrap().status(), StatusCode::CREATED);

    // Filter predicates are plain query parameters: `age=25` is a numeric
    // string coerced to a number, `city=boston` matches case-insensitively.
    let find_request =
        Request::get("/collections/users/documents?age=25&city=boston").body(Body::empty()).unwrap();
    let response = app.oneshot(find_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["documents"].as_array().unwrap().len(), 1);
    assert_eq!(page["documents"][0]["_id"], "1");
}

#[tokio::test]
async fn pagination_reports_has_next_and_a_cursor() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    for i in 0..10 {
        let request = Request::post("/collections/items/documents")
            .header("content-type", "application/json")
            .body(Body::from(json!({"_id": format!("{i:02}")}).to_string()))
            .unwrap();
        assert_eq!(app.clone().oneshot(request).await.unwrap().status(), StatusCode::CREATED);
    }

    let response = app
        .oneshot(Request::get("/collections/items/documents?limit=3").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let page = body_json(response).await;
    assert_eq!(page["documents"].as_array().unwrap().len(), 3);
    assert_eq!(page["has_next"], true);
    assert_eq!(page["has_prev"], false);
    assert_ne!(page["next_cursor"], "");
}

#[tokio::test]
async fn batch_insert_respects_the_configured_limit() {
    let dir = TempDir::new().unwrap();
    let app = router(&dir);

    let documents: Vec<Value> = (0..5).map(|i| json!({"_id": i.to_string()})).collect();
    let request = Request::post("/collections/users/documents/batch")
        .header("content-type", "application/json")
        .body(Body::from(Value::Array(documents).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let inserted = body_json(response).await;
    assert_eq!(inserted.as_array().unwrap().len(), 5);
}
