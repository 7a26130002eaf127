//! Document database HTTP routes.
//!
//! Endpoints decode requests, call the engine facade, and encode the result.
//! No storage logic lives here, per spec.md §1's "HTTP adapter (collaborator)"
//! line.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::engine::{BatchUpdateItem, Engine};
use crate::errors::EngineError;
use crate::model::{coerce_query_value, Document};
use crate::store::{Filter, PaginationOptions};

const PAGINATION_KEYS: [&str; 4] = ["limit", "offset", "after", "before"];

/// Shared state for every document-database route.
pub struct DatabaseState {
    pub engine: Arc<Engine>,
}

impl DatabaseState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(e: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse { error: e.to_string(), code: e.code().to_string() }))
}

fn value_to_document(value: Value) -> Result<Document, (StatusCode, Json<ErrorResponse>)> {
    value.as_object().cloned().ok_or_else(|| error_response(EngineError::validation("document body must be a JSON object")))
}

#[derive(Debug, Deserialize)]
pub struct BatchUpdateItemWire {
    pub id: String,
    pub updates: Value,
}

/// Every non-pagination query parameter is a filter predicate, per spec.md
/// §6's "Filter syntax": a mapping from field name to expected value.
/// Raw query values are strings; [`coerce_query_value`] parses numeric
/// strings to numbers first, falling back to case-insensitive string
/// equality for everything else (spec.md §9's query-string vs. typed-schema
/// Open Question).
pub struct FindQuery(HashMap<String, String>);

impl<'de> Deserialize<'de> for FindQuery {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        HashMap::<String, String>::deserialize(deserializer).map(FindQuery)
    }
}

impl FindQuery {
    fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        for (key, raw) in &self.0 {
            if PAGINATION_KEYS.contains(&key.as_str()) {
                continue;
            }
            filter.insert(key.clone(), coerce_query_value(&Value::String(raw.clone())));
        }
        filter
    }

    fn pagination(&self) -> Result<PaginationOptions, (StatusCode, Json<ErrorResponse>)> {
        let defaults = PaginationOptions::default();
        let parse_usize = |key: &str| -> Result<Option<usize>, (StatusCode, Json<ErrorResponse>)> {
            match self.0.get(key) {
                None => Ok(None),
                Some(raw) => raw
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| error_response(EngineError::validation(format!("`{key}` must be a non-negative integer")))),
            }
        };

        Ok(PaginationOptions {
            limit: parse_usize("limit")?.unwrap_or(defaults.limit),
            offset: parse_usize("offset")?.unwrap_or(defaults.offset),
            after: self.0.get("after").cloned(),
            before: self.0.get("before").cloned(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateIndexRequest {
    pub field: String,
}

#[derive(Debug, Serialize)]
pub struct ListIndexesResponse {
    pub fields: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotPathRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Builds the `/health` route, mounted at the server root.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Builds the document-database routes, nested under `/collections`.
pub fn database_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/:collection/documents", get(find_handler).post(insert_handler))
        .route("/:collection/documents/batch", post(batch_insert_handler).patch(batch_update_handler))
        .route(
            "/:collection/documents/:id",
            get(get_by_id_handler).patch(update_by_id_handler).put(replace_by_id_handler).delete(delete_by_id_handler),
        )
        .route("/:collection/stream", get(stream_handler))
        .route("/:collection/indexes", get(list_indexes_handler).post(create_index_handler))
        .with_state(state)
}

/// Builds the snapshot routes (`save_to_file`/`load_from_file`), nested under
/// `/snapshots`.
pub fn snapshot_routes(state: Arc<DatabaseState>) -> Router {
    Router::new()
        .route("/save", post(save_to_file_handler))
        .route("/load", post(load_from_file_handler))
        .with_state(state)
}

async fn insert_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorResponse>)> {
    let document = value_to_document(body)?;
    let inserted = state.engine.insert(&collection, document).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(Value::Object(inserted))))
}

async fn batch_insert_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Json(body): Json<Vec<Value>>,
) -> Result<(StatusCode, Json<Vec<Value>>), (StatusCode, Json<ErrorResponse>)> {
    let documents = body.into_iter().map(value_to_document).collect::<Result<Vec<_>, _>>()?;
    let inserted = state.engine.batch_insert(&collection, documents).map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(inserted.into_iter().map(Value::Object).collect())))
}

async fn get_by_id_handler(
    State(state): State<Arc<DatabaseState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let document = state.engine.get_by_id(&collection, &id).map_err(error_response)?;
    Ok(Json(Value::Object(document)))
}

async fn update_by_id_handler(
    State(state): State<Arc<DatabaseState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let updates = value_to_document(body)?;
    let updated = state.engine.update_by_id(&collection, &id, updates).map_err(error_response)?;
    Ok(Json(Value::Object(updated)))
}

async fn replace_by_id_handler(
    State(state): State<Arc<DatabaseState>>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let document = value_to_document(body)?;
    let replaced = state.engine.replace_by_id(&collection, &id, document).map_err(error_response)?;
    Ok(Json(Value::Object(replaced)))
}

async fn delete_by_id_handler(
    State(state): State<Arc<DatabaseState>>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.engine.delete_by_id(&collection, &id).map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn batch_update_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Json(body): Json<Vec<BatchUpdateItemWire>>,
) -> Result<Json<Vec<Value>>, (StatusCode, Json<ErrorResponse>)> {
    let items: Vec<BatchUpdateItem> = body
        .into_iter()
        .map(|item| Ok(BatchUpdateItem { id: item.id, updates: value_to_document(item.updates)? }))
        .collect::<Result<Vec<_>, (StatusCode, Json<ErrorResponse>)>>()?;
    let updated = state.engine.batch_update(&collection, items).map_err(error_response)?;
    Ok(Json(updated.into_iter().map(Value::Object).collect()))
}

#[derive(Debug, Serialize)]
struct FindResponse {
    documents: Vec<Value>,
    total: usize,
    has_next: bool,
    has_prev: bool,
    next_cursor: String,
    prev_cursor: String,
}

async fn find_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Query(query): Query<FindQuery>,
) -> Result<Json<FindResponse>, (StatusCode, Json<ErrorResponse>)> {
    let filter = query.filter();
    let pagination = query.pagination()?;
    let page = state.engine.find(&collection, filter, pagination);
    Ok(Json(FindResponse {
        documents: page.documents.into_iter().map(Value::Object).collect(),
        total: page.total,
        has_next: page.has_next,
        has_prev: page.has_prev,
        next_cursor: page.next_cursor,
        prev_cursor: page.prev_cursor,
    }))
}

/// Streams matching documents as newline-delimited JSON. The engine delivers
/// documents on a bounded channel that gives up on a stalled client after
/// five seconds (spec.md §5/§9); this handler just forwards each item as it
/// arrives.
async fn stream_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Query(query): Query<FindQuery>,
) -> Result<axum::response::Response, (StatusCode, Json<ErrorResponse>)> {
    let filter = query.filter();
    let rx = state.engine.stream(&collection, filter);
    let (tx, forward_rx) = tokio::sync::mpsc::unbounded_channel::<Result<Vec<u8>, std::io::Error>>();

    std::thread::spawn(move || {
        for document in rx.iter() {
            let mut line = serde_json::to_vec(&Value::Object(document)).unwrap_or_default();
            line.push(b'\n');
            if tx.send(Ok(line)).is_err() {
                break;
            }
        }
    });

    let body_stream = UnboundedReceiverStream::new(forward_rx).map(|chunk| chunk.map(axum::body::Bytes::from));
    let body = Body::from_stream(body_stream);

    Ok(axum::response::Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/x-ndjson")
        .body(body)
        .expect("response with a streamed body always builds"))
}

async fn create_index_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
    Json(body): Json<CreateIndexRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    state.engine.create_index(&collection, &body.field).map_err(error_response)?;
    Ok(StatusCode::CREATED)
}

async fn list_indexes_handler(
    State(state): State<Arc<DatabaseState>>,
    Path(collection): Path<String>,
) -> Json<ListIndexesResponse> {
    Json(ListIndexesResponse { fields: state.engine.list_indexes(&collection) })
}

async fn save_to_file_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(body): Json<SnapshotPathRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.save_to_file(std::path::Path::new(&body.path)).map_err(error_response)?;
    Ok(Json(MessageResponse { message: format!("checkpoint written to {}", body.path) }))
}

async fn load_from_file_handler(
    State(state): State<Arc<DatabaseState>>,
    Json(body): Json<SnapshotPathRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.engine.load_from_file(std::path::Path::new(&body.path)).map_err(error_response)?;
    Ok(Json(MessageResponse { message: format!("state loaded from {}", body.path) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> FindQuery {
        FindQuery(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn pagination_keys_are_excluded_from_the_filter() {
        let q = query(&[("limit", "5"), ("offset", "2"), ("after", "u1"), ("city", "Boston")]);
        let filter = q.filter();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get("city"), Some(&Value::String("Boston".to_string())));
    }

    #[test]
    fn numeric_filter_values_are_coerced() {
        let q = query(&[("age", "25")]);
        assert_eq!(q.filter().get("age"), Some(&Value::from(25)));
    }

    #[test]
    fn invalid_limit_is_a_validation_error() {
        let q = query(&[("limit", "not-a-number")]);
        assert!(q.pagination().is_err());
    }
}
