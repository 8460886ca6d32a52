//! Fake ticketing host exposing installation metadata and installation storage.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Installed,
    /// Storage endpoints answer 404.
    Missing,
    /// Metadata endpoint answers 404.
    NoMetadata,
    /// Storage endpoints answer 500.
    Broken,
}

#[derive(Clone)]
pub struct FakeHost {
    pub mode: Arc<Mutex<Mode>>,
    pub docs: Arc<Mutex<HashMap<String, String>>>,
    pub last_auth: Arc<Mutex<Option<String>>>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            docs: Arc::new(Mutex::new(HashMap::new())),
            last_auth: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_mode(&self, mode: Mode) { *self.mode.lock() = mode; }

    pub fn doc(&self, key: &str) -> Option<String> { self.docs.lock().get(key).cloned() }

    pub fn put_doc(&self, key: &str, value: &str) { self.docs.lock().insert(key.to_string(), value.to_string()); }

    fn record(&self, headers: &HeaderMap, line: String) {
        *self.last_auth.lock() = headers.get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        self.requests.lock().push(line);
    }
}

async fn metadata(State(host): State<FakeHost>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    host.record(&headers, "GET metadata".into());
    match *host.mode.lock() {
        Mode::NoMetadata => (StatusCode::NOT_FOUND, Json(json!({"error": "RecordNotFound"}))),
        _ => (StatusCode::OK, Json(json!({"installationId": 42, "appId": 7}))),
    }
}

fn storage_status(host: &FakeHost, id: &str) -> Option<StatusCode> {
    match *host.mode.lock() {
        Mode::Missing => Some(StatusCode::NOT_FOUND),
        Mode::Broken => Some(StatusCode::INTERNAL_SERVER_ERROR),
        _ if id != "42" => Some(StatusCode::NOT_FOUND),
        _ => None,
    }
}

async fn storage_get(
    State(host): State<FakeHost>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let key = q.get("key").cloned().unwrap_or_default();
    host.record(&headers, format!("GET {} {}", id, key));
    if let Some(status) = storage_status(&host, &id) {
        return (status, Json(json!({"error": "unavailable"})));
    }
    match host.doc(&key) {
        Some(v) => (StatusCode::OK, Json(json!({"key": key, "value": v}))),
        None => (StatusCode::OK, Json(json!({}))),
    }
}

async fn storage_put(
    State(host): State<FakeHost>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = body.get("key").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    host.record(&headers, format!("PUT {} {}", id, key));
    if let Some(status) = storage_status(&host, &id) {
        return (status, Json(json!({"error": "unavailable"})));
    }
    let value = body.get("value").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    host.put_doc(&key, &value);
    (StatusCode::OK, Json(json!({"key": key, "value": value})))
}

pub fn fake_host_router(host: FakeHost) -> Router {
    Router::new()
        .route("/api/v2/apps/metadata.json", get(metadata))
        .route("/api/v2/apps/installations/{id}/storage.json", get(storage_get).put(storage_put))
        .with_state(host)
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
