use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::services::config::ClientConfig;
use crate::services::error::ApiError;

/// One REST call, relative to the API prefix
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// A file picked in a form, ready to be sent to the media endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Moves requests over the wire. Responses come back as raw JSON; an empty
/// body decodes as `null`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;

    async fn upload(&self, path: &str, upload: MediaUpload) -> Result<Value, ApiError>;
}

/// Transport backed by a shared reqwest client
pub struct ReqwestTransport {
    client: Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        self.config
            .endpoint(path)
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    async fn read(response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request.path)?;
        let mut builder = self.client.request(request.method, url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        Self::read(response).await
    }

    async fn upload(&self, path: &str, upload: MediaUpload) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("file", part);
        let response = self.client.post(url).multipart(form).send().await?;
        Self::read(response).await
    }
}

/// API client handing typed responses to the repositories
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Create a client talking to the configured server over HTTP
    pub fn from_config(config: ClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(config)?)))
    }

    /// Issue one request and decode the body as `T`
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        debug!(%method, %path, "api request");

        match self.transport.send(request).await {
            Ok(value) => serde_json::from_value(value).map_err(|e| {
                warn!(%method, %path, error = %e, "failed to decode response");
                ApiError::from(e)
            }),
            Err(e) => {
                warn!(%method, %path, error = %e, "api request failed");
                Err(e)
            }
        }
    }

    /// Issue one request whose response body is ignored
    pub async fn execute(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.request::<Value>(request).await.map(|_| ())
    }

    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        upload: MediaUpload,
    ) -> Result<T, ApiError> {
        debug!(%path, file_name = %upload.file_name, "uploading media");
        let value = self.transport.upload(path, upload).await.map_err(|e| {
            warn!(%path, error = %e, "media upload failed");
            e
        })?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_request_decodes_body() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(Method::GET, "bank/b-1", json!({ "name": "BDO" }));
        let client = ApiClient::new(transport.clone());

        let body: Value = client.request(ApiRequest::get("bank/b-1")).await.unwrap();

        assert_eq!(body["name"], "BDO");
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported() {
        let transport = Arc::new(RecordingTransport::new());
        transport.respond(Method::GET, "bank", json!({ "not": "a list" }));
        let client = ApiClient::new(transport);

        let result: Result<Vec<String>, ApiError> = client.request(ApiRequest::get("bank")).await;
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[tokio::test]
    async fn test_server_errors_pass_through_untouched() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail(
            Method::POST,
            "bank",
            ApiError::from_response(409, r#"{"error":"Bank already exists"}"#),
        );
        let client = ApiClient::new(transport.clone());

        let result = client.execute(ApiRequest::post("bank")).await;

        assert_eq!(result.unwrap_err().user_message(), "Bank already exists");
        assert_eq!(transport.calls().len(), 1);
    }
}
