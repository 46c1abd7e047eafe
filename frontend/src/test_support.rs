//! In-memory transport for unit tests: canned responses per method and
//! path, plus a log of every request that went out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Method;
use serde_json::Value;
use shared::{Audit, Bank, Scope};

use crate::services::api::{ApiRequest, HttpTransport, MediaUpload};
use crate::services::error::ApiError;

#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<HashMap<(Method, String), Result<Value, ApiError>>>,
    calls: Mutex<Vec<ApiRequest>>,
    uploads: Mutex<Vec<(String, MediaUpload)>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Ok(body));
    }

    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        self.responses
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Err(error));
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, MediaUpload)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn lookup(&self, method: Method, path: &str) -> Result<Value, ApiError> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ApiError::from_response(404, r#"{"error":"not found"}"#)))
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(request.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup(request.method, &request.path)
    }

    async fn upload(&self, path: &str, upload: MediaUpload) -> Result<Value, ApiError> {
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), upload));
        self.lookup(Method::POST, path)
    }
}

pub fn bank(id: &str, name: &str) -> Bank {
    let stamp = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    Bank {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        media_id: None,
        media: None,
        scope: Scope {
            organization_id: "org-1".to_string(),
            branch_id: "br-1".to_string(),
        },
        audit: Audit {
            created_at: stamp,
            updated_at: stamp,
            deleted_at: None,
            created_by_id: None,
            updated_by_id: None,
            deleted_by_id: None,
        },
    }
}

pub fn bank_json(id: &str, name: &str) -> Value {
    serde_json::to_value(bank(id, name)).unwrap()
}
