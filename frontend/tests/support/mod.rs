//! In-process REST fixture following the back-office conventions, served
//! on an ephemeral port. Records live in memory, newest first.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use coop_frontend::{ApiClient, ClientConfig, ClientContext, ReqwestTransport};
use serde_json::{json, Map, Value};

const STAMP: &str = "2024-01-15T10:30:00Z";

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Store {
    records: HashMap<String, Vec<Value>>,
    log: Vec<LoggedRequest>,
}

#[derive(Clone, Default)]
pub struct Fixture {
    store: Arc<Mutex<Store>>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records oldest first so the list reads newest first
    pub fn seed(&self, resource: &str, records: Vec<Value>) {
        let mut store = self.store.lock().unwrap();
        let list = store.records.entry(resource.to_string()).or_default();
        for record in records {
            list.insert(0, record);
        }
    }

    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.store.lock().unwrap().log.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn record(&self, method: Method, path: String, body: Option<Value>) {
        self.store
            .lock()
            .unwrap()
            .log
            .push(LoggedRequest { method, path, body });
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/v1/media", post(upload_media))
            .route("/api/v1/:resource", get(list).post(create))
            .route("/api/v1/:resource/search", get(search))
            .route("/api/v1/:resource/bulk-delete", delete(bulk_delete))
            .route("/api/v1/:resource/:id", get(detail).put(update).delete(remove))
            .with_state(self.clone())
    }

    /// Serve on 127.0.0.1 with an OS-assigned port
    pub async fn spawn(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }
}

pub fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::with_base_url(&format!("http://{}", addr)).unwrap()
}

pub async fn start() -> (Fixture, ClientContext) {
    let fixture = Fixture::new();
    let addr = fixture.spawn().await;
    let ctx = coop_frontend::initialize_client(config_for(addr)).unwrap();
    (fixture, ctx)
}

pub fn client_for(addr: SocketAddr) -> ApiClient {
    let transport = ReqwestTransport::new(config_for(addr)).unwrap();
    ApiClient::new(Arc::new(transport))
}

pub fn bank(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": "",
        "organization_id": "org-1",
        "branch_id": "br-1",
        "created_at": STAMP,
        "updated_at": STAMP
    })
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn list(State(fx): State<Fixture>, Path(resource): Path<String>) -> Response {
    fx.record(Method::GET, format!("/api/v1/{}", resource), None);
    let store = fx.store.lock().unwrap();
    let records = store.records.get(&resource).cloned().unwrap_or_default();
    Json(Value::Array(records)).into_response()
}

async fn search(
    State(fx): State<Fixture>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    fx.record(Method::GET, format!("/api/v1/{}/search", resource), None);
    let page_index: usize = params.get("pageIndex").and_then(|v| v.parse().ok()).unwrap_or(0);
    let page_size: usize = params.get("pageSize").and_then(|v| v.parse().ok()).unwrap_or(10);
    if page_size == 0 {
        return error(StatusCode::BAD_REQUEST, "pageSize must be positive");
    }

    let store = fx.store.lock().unwrap();
    let records = store.records.get(&resource).cloned().unwrap_or_default();
    let total_size = records.len();
    let total_page = total_size.div_ceil(page_size);
    let data: Vec<Value> = records
        .into_iter()
        .skip(page_index * page_size)
        .take(page_size)
        .collect();
    let pages: Vec<Value> = (0..total_page)
        .map(|i| json!({ "page": format!("{}", i + 1), "pageIndex": i }))
        .collect();
    Json(json!({
        "data": data,
        "pageIndex": page_index,
        "totalPage": total_page,
        "pageSize": page_size,
        "totalSize": total_size,
        "pages": pages
    }))
    .into_response()
}

async fn detail(State(fx): State<Fixture>, Path((resource, id)): Path<(String, String)>) -> Response {
    fx.record(Method::GET, format!("/api/v1/{}/{}", resource, id), None);
    let store = fx.store.lock().unwrap();
    store
        .records
        .get(&resource)
        .and_then(|records| records.iter().find(|r| r["id"] == id.as_str()).cloned())
        .map(|record| Json(record).into_response())
        .unwrap_or_else(|| error(StatusCode::NOT_FOUND, &format!("{} not found", resource)))
}

async fn create(
    State(fx): State<Fixture>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    fx.record(Method::POST, format!("/api/v1/{}", resource), Some(body.clone()));
    let Value::Object(mut fields) = body else {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "expected an object");
    };
    if fields.get("name").and_then(Value::as_str).map_or(true, str::is_empty) {
        return error(StatusCode::BAD_REQUEST, "name is required");
    }
    fields.insert("id".to_string(), json!(uuid::Uuid::new_v4().to_string()));
    stamp(&mut fields);

    let record = Value::Object(fields);
    let mut store = fx.store.lock().unwrap();
    store
        .records
        .entry(resource)
        .or_default()
        .insert(0, record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update(
    State(fx): State<Fixture>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    fx.record(Method::PUT, format!("/api/v1/{}/{}", resource, id), Some(body.clone()));
    let mut store = fx.store.lock().unwrap();
    let Some(record) = store
        .records
        .get_mut(&resource)
        .and_then(|records| records.iter_mut().find(|r| r["id"] == id.as_str()))
    else {
        return error(StatusCode::NOT_FOUND, &format!("{} not found", resource));
    };
    if let (Value::Object(target), Value::Object(changes)) = (record, body) {
        target.extend(changes);
        target.insert("id".to_string(), json!(id));
        return Json(Value::Object(target.clone())).into_response();
    }
    error(StatusCode::UNPROCESSABLE_ENTITY, "expected an object")
}

async fn remove(State(fx): State<Fixture>, Path((resource, id)): Path<(String, String)>) -> Response {
    fx.record(Method::DELETE, format!("/api/v1/{}/{}", resource, id), None);
    let mut store = fx.store.lock().unwrap();
    let records = store.records.entry(resource).or_default();
    let before = records.len();
    records.retain(|r| r["id"] != id.as_str());
    if records.len() == before {
        return error(StatusCode::NOT_FOUND, "record not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn bulk_delete(
    State(fx): State<Fixture>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    fx.record(
        Method::DELETE,
        format!("/api/v1/{}/bulk-delete", resource),
        Some(body.clone()),
    );
    let ids: Vec<String> = body["ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    let mut store = fx.store.lock().unwrap();
    store
        .records
        .entry(resource)
        .or_default()
        .retain(|r| !ids.iter().any(|id| r["id"] == id.as_str()));
    StatusCode::NO_CONTENT.into_response()
}

async fn upload_media(State(fx): State<Fixture>, mut multipart: Multipart) -> Response {
    fx.record(Method::POST, "/api/v1/media".to_string(), None);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let file_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let Ok(bytes) = field.bytes().await else {
            return error(StatusCode::BAD_REQUEST, "unreadable file");
        };
        let id = uuid::Uuid::new_v4().to_string();
        return Json(json!({
            "id": id,
            "file_name": file_name,
            "file_size": bytes.len(),
            "file_type": file_type,
            "url": format!("https://cdn.coop.test/{}", id)
        }))
        .into_response();
    }
    error(StatusCode::BAD_REQUEST, "file is required")
}

fn stamp(fields: &mut Map<String, Value>) {
    fields
        .entry("organization_id")
        .or_insert_with(|| json!("org-1"));
    fields.entry("branch_id").or_insert_with(|| json!("br-1"));
    fields.insert("created_at".to_string(), json!(STAMP));
    fields.insert("updated_at".to_string(), json!(STAMP));
}
