//! # CRUD Repository
//!
//! Every back-office resource follows the same REST conventions, so one
//! generic repository covers them all:
//!
//! | operation             | request                                   |
//! |-----------------------|-------------------------------------------|
//! | `get_all`             | `GET /{resource}`                         |
//! | `get_by_id`           | `GET /{resource}/{id}`                    |
//! | `get_paginated`       | `GET /{resource}/search?pageIndex=…`      |
//! | `get_paginated_at`    | `GET /{resource}/{sub}/search?pageIndex=…`|
//! | `get_by_organization` | `GET /{resource}/organization/{id}`       |
//! | `create`              | `POST /{resource}`                        |
//! | `update_by_id`        | `PUT /{resource}/{id}`                    |
//! | `delete_by_id`        | `DELETE /{resource}/{id}`                 |
//! | `delete_many`         | `DELETE /{resource}/bulk-delete`          |
//!
//! Each operation issues exactly one call and returns the decoded body
//! as-is. Errors are not retried. A blank id is refused before any call,
//! since it would address the whole collection.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::{PaginatedResult, PaginationQuery, ValidationErrors};

use crate::services::api::{ApiClient, ApiRequest};
use crate::services::error::ApiError;

/// Body of a bulk delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<String>,
}

fn require_id<'a>(field: &str, id: &'a str) -> Result<&'a str, ApiError> {
    let id = id.trim().trim_matches('/');
    if id.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add(field, format!("{} is required", field));
        return Err(ApiError::Validation(errors));
    }
    Ok(id)
}

/// Typed CRUD operations for one resource path
pub struct CrudRepository<T, TRequest> {
    client: ApiClient,
    resource: String,
    _types: PhantomData<fn() -> (T, TRequest)>,
}

impl<T, TRequest> Clone for CrudRepository<T, TRequest> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            resource: self.resource.clone(),
            _types: PhantomData,
        }
    }
}

impl<T, TRequest> CrudRepository<T, TRequest>
where
    T: DeserializeOwned,
    TRequest: Serialize,
{
    pub fn new(client: ApiClient, resource: impl Into<String>) -> Self {
        Self {
            client,
            resource: resource.into().trim_matches('/').to_string(),
            _types: PhantomData,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `{resource}/{segment}` with surrounding slashes removed
    pub fn path(&self, segment: &str) -> String {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            self.resource.clone()
        } else {
            format!("{}/{}", self.resource, segment)
        }
    }

    /// `{resource}/{id}`, or a validation error for a blank id
    fn record_path(&self, id: &str) -> Result<String, ApiError> {
        Ok(self.path(require_id("id", id)?))
    }

    pub async fn get_all(&self) -> Result<Vec<T>, ApiError> {
        self.client.request(ApiRequest::get(self.path(""))).await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<T, ApiError> {
        let path = self.record_path(id)?;
        self.client.request(ApiRequest::get(path)).await
    }

    pub async fn get_paginated(
        &self,
        query: &PaginationQuery,
    ) -> Result<PaginatedResult<T>, ApiError> {
        self.get_paginated_at("", query).await
    }

    /// Paginated search under a sub-path such as `member-profile/{id}`
    pub async fn get_paginated_at(
        &self,
        sub_path: &str,
        query: &PaginationQuery,
    ) -> Result<PaginatedResult<T>, ApiError> {
        let search = match sub_path.trim_matches('/') {
            "" => "search".to_string(),
            sub => format!("{}/search", sub),
        };
        let request = ApiRequest::get(self.path(&search)).with_query(query.to_params());
        self.client.request(request).await
    }

    pub async fn get_by_organization(&self, organization_id: &str) -> Result<Vec<T>, ApiError> {
        let organization_id = require_id("organization_id", organization_id)?;
        let path = self.path(&format!("organization/{}", organization_id));
        self.client.request(ApiRequest::get(path)).await
    }

    pub async fn create(&self, payload: &TRequest) -> Result<T, ApiError> {
        let request = ApiRequest::post(self.path("")).with_json(payload)?;
        self.client.request(request).await
    }

    pub async fn update_by_id(&self, id: &str, payload: &TRequest) -> Result<T, ApiError> {
        let request = ApiRequest::put(self.record_path(id)?).with_json(payload)?;
        self.client.request(request).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), ApiError> {
        self.client.execute(ApiRequest::delete(self.record_path(id)?)).await
    }

    pub async fn delete_many(&self, ids: &[String]) -> Result<(), ApiError> {
        let body = BulkDeleteRequest { ids: ids.to_vec() };
        let request = ApiRequest::delete(self.path("bulk-delete")).with_json(&body)?;
        self.client.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bank, bank_json, RecordingTransport};
    use reqwest::Method;
    use rstest::rstest;
    use serde_json::json;
    use shared::{Bank, BankRequest};
    use std::sync::Arc;

    fn setup() -> (Arc<RecordingTransport>, CrudRepository<Bank, BankRequest>) {
        let transport = Arc::new(RecordingTransport::new());
        let repo = CrudRepository::new(ApiClient::new(transport.clone()), "/bank/");
        (transport, repo)
    }

    #[tokio::test]
    async fn test_get_by_id_issues_one_get() {
        let (transport, repo) = setup();
        transport.respond(Method::GET, "bank/b-1", bank_json("b-1", "BDO"));

        let found = repo.get_by_id("b-1").await.unwrap();

        assert_eq!(found, bank("b-1", "BDO"));
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
        assert_eq!(calls[0].path, "bank/b-1");
        assert!(calls[0].body.is_none());
    }

    #[tokio::test]
    async fn test_paginated_sends_query_params() {
        let (transport, repo) = setup();
        transport.respond(
            Method::GET,
            "bank/search",
            json!({
                "data": [bank_json("b-1", "BDO")],
                "pageIndex": 0,
                "totalPage": 1,
                "pageSize": 10,
                "totalSize": 1
            }),
        );

        let page = repo
            .get_paginated(&PaginationQuery::page(0, 10).with_filter("BDO"))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 1);
        let calls = transport.calls();
        assert_eq!(
            calls[0].query,
            vec![
                ("pageIndex".to_string(), "0".to_string()),
                ("pageSize".to_string(), "10".to_string()),
                ("filter".to_string(), "BDO".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_paginated_at_sub_path() {
        let (transport, repo) = setup();
        transport.respond(
            Method::GET,
            "bank/branch/br-1/search",
            json!({ "data": [], "pageIndex": 0, "totalPage": 0, "pageSize": 10, "totalSize": 0 }),
        );

        repo.get_paginated_at("/branch/br-1/", &PaginationQuery::default())
            .await
            .unwrap();

        assert_eq!(transport.count(Method::GET, "bank/branch/br-1/search"), 1);
    }

    #[tokio::test]
    async fn test_create_posts_payload() {
        let (transport, repo) = setup();
        transport.respond(Method::POST, "bank", bank_json("b-2", "BPI"));

        let payload = BankRequest {
            name: "BPI".to_string(),
            description: "desc".to_string(),
            media_id: None,
        };
        let created = repo.create(&payload).await.unwrap();

        assert_eq!(created.id, "b-2");
        let calls = transport.calls();
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].body, Some(json!({ "name": "BPI", "description": "desc" })));
    }

    #[tokio::test]
    async fn test_update_and_delete_paths() {
        let (transport, repo) = setup();
        transport.respond(Method::PUT, "bank/b-1", bank_json("b-1", "BDO Unibank"));
        transport.respond(Method::DELETE, "bank/b-1", serde_json::Value::Null);
        transport.respond(Method::DELETE, "bank/bulk-delete", serde_json::Value::Null);
        transport.respond(Method::GET, "bank/organization/org-1", json!([]));

        repo.update_by_id("b-1", &BankRequest::default()).await.unwrap();
        repo.delete_by_id("b-1").await.unwrap();
        repo.delete_many(&["b-2".to_string(), "b-3".to_string()])
            .await
            .unwrap();
        repo.get_by_organization("org-1").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].method, Method::DELETE);
        assert_eq!(calls[2].path, "bank/bulk-delete");
        assert_eq!(calls[2].body, Some(json!({ "ids": ["b-2", "b-3"] })));
        assert_eq!(calls[3].path, "bank/organization/org-1");
    }

    #[tokio::test]
    async fn test_errors_are_not_retried() {
        let (transport, repo) = setup();
        transport.fail(Method::GET, "bank", ApiError::Network("connection reset".to_string()));

        assert!(repo.get_all().await.is_err());
        assert_eq!(transport.count(Method::GET, "bank"), 1);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("/")]
    #[tokio::test]
    async fn test_blank_id_is_refused_without_a_call(#[case] id: &str) {
        let (transport, repo) = setup();
        let payload = BankRequest {
            name: "BDO".to_string(),
            ..BankRequest::default()
        };

        let results = [
            repo.get_by_id(id).await.map(|_| ()),
            repo.update_by_id(id, &payload).await.map(|_| ()),
            repo.delete_by_id(id).await,
            repo.get_by_organization(id).await.map(|_| ()),
        ];

        for result in results {
            assert!(matches!(result, Err(ApiError::Validation(_))), "{:?}", result);
        }
        assert!(transport.calls().is_empty());
    }
}
