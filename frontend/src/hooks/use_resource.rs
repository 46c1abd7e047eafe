//! # Resource Data Layer
//!
//! One `DataLayer` per resource wraps its `CrudRepository` with the query
//! cache. Queries are keyed under the resource name:
//!
//! - `[resource, "all"]`
//! - `[resource, "paginated", <query>]` and `[resource, "paginated", <sub>, <query>]`
//! - `[resource, "organization", <id>]`
//! - `[resource, "detail", <id>]`
//!
//! Mutations validate their payload first, then patch cached queries of
//! the resource with the same reducer used for pushed events, and mark
//! the `[resource]` prefix stale. Other resources are never touched.
//! A created record is only placed into the full list, unfiltered pages
//! and details. Filtered, scoped and custom-keyed queries cannot tell
//! whether it belongs to them, so they are marked stale instead.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::models::Entity;
use shared::{PaginatedResult, PaginationQuery, Schema};
use tracing::{info, warn};

use crate::hooks::query_cache::{CacheKey, QueryCache};
use crate::hooks::reducer::{reduce, QueryData, ResourceChange};
use crate::services::api::ApiClient;
use crate::services::error::ApiError;
use crate::services::repository::CrudRepository;

pub type SuccessCallback<V> = Arc<dyn Fn(&V) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Payload type for resources the client never writes
pub type NoPayload = ();

/// Per-call options for a query
pub struct QueryOptions<V> {
    pub enabled: bool,
    pub query_key: Option<CacheKey>,
    on_success: Option<SuccessCallback<V>>,
    on_error: Option<ErrorCallback>,
}

impl<V> Default for QueryOptions<V> {
    fn default() -> Self {
        Self {
            enabled: true,
            query_key: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<V> QueryOptions<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A disabled query resolves to `None` without touching the network
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Cache under a caller-chosen key, e.g. for filtered lists
    pub fn with_query_key(mut self, key: CacheKey) -> Self {
        self.query_key = Some(key);
        self
    }

    pub fn on_success(mut self, f: impl Fn(&V) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

/// Per-call options for a mutation
pub struct MutationOptions<V> {
    pub invalidate: bool,
    on_success: Option<SuccessCallback<V>>,
    on_error: Option<ErrorCallback>,
}

impl<V> Default for MutationOptions<V> {
    fn default() -> Self {
        Self {
            invalidate: true,
            on_success: None,
            on_error: None,
        }
    }
}

impl<V> MutationOptions<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip marking the resource stale; cached queries are still patched
    pub fn without_invalidation(mut self) -> Self {
        self.invalidate = false;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&V) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

/// Cache keys of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKeys {
    resource: String,
}

impl ResourceKeys {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    /// Prefix covering every query of the resource
    pub fn all(&self) -> CacheKey {
        CacheKey::new([self.resource.as_str()])
    }

    pub fn list(&self) -> CacheKey {
        self.all().push("all")
    }

    pub fn paginated(&self, query: &PaginationQuery) -> CacheKey {
        self.all().push("paginated").push_json(query)
    }

    pub fn paginated_at(&self, sub_path: &str, query: &PaginationQuery) -> CacheKey {
        self.all()
            .push("paginated")
            .push(sub_path.trim_matches('/'))
            .push_json(query)
    }

    pub fn organization(&self, organization_id: &str) -> CacheKey {
        self.all().push("organization").push(organization_id)
    }

    pub fn detail(&self, id: &str) -> CacheKey {
        self.all().push("detail").push(id)
    }

    /// Whether a newly created record can be placed into the query under
    /// `key` without a refetch
    pub fn accepts_created(&self, key: &CacheKey) -> bool {
        match key.parts() {
            [resource, kind] => resource == &self.resource && kind == "all",
            [resource, kind, _] if resource == &self.resource && kind == "detail" => true,
            [resource, kind, query] if resource == &self.resource && kind == "paginated" => {
                serde_json::from_str::<PaginationQuery>(query).is_ok_and(|q| {
                    q.filter.as_deref().map_or(true, str::is_empty)
                        && q.sort.as_deref().map_or(true, str::is_empty)
                })
            }
            _ => false,
        }
    }
}

/// Cache-aware queries and mutations for one resource
pub struct DataLayer<T, TRequest> {
    repository: CrudRepository<T, TRequest>,
    cache: QueryCache,
    keys: ResourceKeys,
}

impl<T, TRequest> Clone for DataLayer<T, TRequest> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            cache: self.cache.clone(),
            keys: self.keys.clone(),
        }
    }
}

/// Build the data layer for `resource`
pub fn create_data_layer<T, TRequest>(
    client: ApiClient,
    cache: QueryCache,
    resource: &str,
) -> DataLayer<T, TRequest>
where
    T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
    TRequest: Serialize,
{
    DataLayer::new(client, cache, resource)
}

impl<T, TRequest> DataLayer<T, TRequest>
where
    T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
    TRequest: Serialize,
{
    pub fn new(client: ApiClient, cache: QueryCache, resource: &str) -> Self {
        let repository = CrudRepository::new(client, resource);
        let keys = ResourceKeys::new(repository.resource());
        Self {
            repository,
            cache,
            keys,
        }
    }

    pub fn keys(&self) -> &ResourceKeys {
        &self.keys
    }

    pub fn repository(&self) -> &CrudRepository<T, TRequest> {
        &self.repository
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn resource(&self) -> &str {
        self.repository.resource()
    }

    async fn run_query<V, F, Fut>(
        &self,
        default_key: CacheKey,
        options: QueryOptions<V>,
        wrap: fn(V) -> QueryData<T>,
        unwrap: fn(QueryData<T>) -> Option<V>,
        fetcher: F,
    ) -> Result<Option<V>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        if !options.enabled {
            return Ok(None);
        }
        let key = options.query_key.clone().unwrap_or(default_key);
        let result = self
            .cache
            .fetch(key.clone(), move || async move { fetcher().await.map(wrap) })
            .await
            .and_then(|data| {
                unwrap(data).ok_or_else(|| {
                    ApiError::Decode(format!("cached entry {} holds a different shape", key))
                })
            });

        match &result {
            Ok(value) => {
                if let Some(on_success) = &options.on_success {
                    on_success(value);
                }
            }
            Err(e) => {
                warn!(resource = %self.resource(), error = %e, "query failed");
                if let Some(on_error) = &options.on_error {
                    on_error(e);
                }
            }
        }
        result.map(Some)
    }

    pub async fn get_all(&self, options: QueryOptions<Vec<T>>) -> Result<Option<Vec<T>>, ApiError> {
        self.run_query(
            self.keys.list(),
            options,
            QueryData::List,
            QueryData::into_list,
            || self.repository.get_all(),
        )
        .await
    }

    pub async fn get_by_id(&self, id: &str, options: QueryOptions<T>) -> Result<Option<T>, ApiError> {
        self.run_query(
            self.keys.detail(id),
            options,
            QueryData::Detail,
            QueryData::into_detail,
            || self.repository.get_by_id(id),
        )
        .await
    }

    pub async fn get_paginated(
        &self,
        query: &PaginationQuery,
        options: QueryOptions<PaginatedResult<T>>,
    ) -> Result<Option<PaginatedResult<T>>, ApiError> {
        self.run_query(
            self.keys.paginated(query),
            options,
            QueryData::Page,
            QueryData::into_page,
            || self.repository.get_paginated(query),
        )
        .await
    }

    pub async fn get_paginated_at(
        &self,
        sub_path: &str,
        query: &PaginationQuery,
        options: QueryOptions<PaginatedResult<T>>,
    ) -> Result<Option<PaginatedResult<T>>, ApiError> {
        self.run_query(
            self.keys.paginated_at(sub_path, query),
            options,
            QueryData::Page,
            QueryData::into_page,
            || self.repository.get_paginated_at(sub_path, query),
        )
        .await
    }

    pub async fn get_by_organization(
        &self,
        organization_id: &str,
        options: QueryOptions<Vec<T>>,
    ) -> Result<Option<Vec<T>>, ApiError> {
        self.run_query(
            self.keys.organization(organization_id),
            options,
            QueryData::List,
            QueryData::into_list,
            || self.repository.get_by_organization(organization_id),
        )
        .await
    }

    /// Cached list without fetching
    pub fn peek_all(&self) -> Option<Vec<T>> {
        self.cache
            .get::<QueryData<T>>(&self.keys.list())
            .and_then(QueryData::into_list)
    }

    pub fn peek_paginated(&self, query: &PaginationQuery) -> Option<PaginatedResult<T>> {
        self.cache
            .get::<QueryData<T>>(&self.keys.paginated(query))
            .and_then(QueryData::into_page)
    }

    pub fn peek_detail(&self, id: &str) -> Option<T> {
        self.cache
            .get::<QueryData<T>>(&self.keys.detail(id))
            .and_then(QueryData::into_detail)
    }

    /// Patch cached queries of this resource. Returns how many entries were
    /// patched. A creation only patches queries it provably belongs to and
    /// marks the rest stale.
    pub fn apply_change(&self, change: &ResourceChange<T>) -> usize {
        if !matches!(change, ResourceChange::Created(_)) {
            return self
                .cache
                .update::<QueryData<T>, _>(&self.keys.all(), |data| reduce(change, data));
        }

        let prefix = self.keys.all();
        let mut patched = 0;
        for key in self.cache.keys().into_iter().filter(|k| k.starts_with(&prefix)) {
            if self.keys.accepts_created(&key) {
                patched += self
                    .cache
                    .update::<QueryData<T>, _>(&key, |data| reduce(change, data));
            } else {
                self.cache.invalidate(&key);
            }
        }
        patched
    }

    pub fn invalidate(&self) -> usize {
        self.cache.invalidate(&self.keys.all())
    }

    pub(crate) fn settle<V>(
        &self,
        action: &str,
        result: Result<V, ApiError>,
        options: &MutationOptions<V>,
    ) -> Result<V, ApiError> {
        match &result {
            Ok(value) => {
                if options.invalidate {
                    self.invalidate();
                }
                if let Some(on_success) = &options.on_success {
                    on_success(value);
                }
            }
            Err(e) => {
                warn!(resource = %self.resource(), action, error = %e, "mutation failed");
                if let Some(on_error) = &options.on_error {
                    on_error(e);
                }
            }
        }
        result
    }
}

impl<T, TRequest> DataLayer<T, TRequest>
where
    T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
    TRequest: Serialize + Schema,
{
    pub async fn create(&self, payload: TRequest, options: MutationOptions<T>) -> Result<T, ApiError> {
        let result: Result<T, ApiError> = async {
            let payload = payload.parse()?;
            let created = self.repository.create(&payload).await?;
            self.apply_change(&ResourceChange::Created(created.clone()));
            self.cache
                .set(self.keys.detail(created.id()), QueryData::Detail(created.clone()));
            info!(resource = %self.resource(), id = %created.id(), "created");
            Ok::<_, ApiError>(created)
        }
        .await;
        self.settle("create", result, &options)
    }

    pub async fn update_by_id(
        &self,
        id: &str,
        payload: TRequest,
        options: MutationOptions<T>,
    ) -> Result<T, ApiError> {
        let result: Result<T, ApiError> = async {
            let payload = payload.parse()?;
            let updated = self.repository.update_by_id(id, &payload).await?;
            self.apply_change(&ResourceChange::Updated(updated.clone()));
            self.cache
                .set(self.keys.detail(updated.id()), QueryData::Detail(updated.clone()));
            info!(resource = %self.resource(), id, "updated");
            Ok::<_, ApiError>(updated)
        }
        .await;
        self.settle("update", result, &options)
    }
}

impl<T, TRequest> DataLayer<T, TRequest>
where
    T: Entity + DeserializeOwned + Clone + Send + Sync + 'static,
    TRequest: Serialize,
{
    pub async fn delete_by_id(&self, id: &str, options: MutationOptions<()>) -> Result<(), ApiError> {
        let result = async {
            self.repository.delete_by_id(id).await?;
            self.apply_change(&ResourceChange::Deleted(id.to_string()));
            info!(resource = %self.resource(), id, "deleted");
            Ok::<_, ApiError>(())
        }
        .await;
        self.settle("delete", result, &options)
    }

    pub async fn delete_many(&self, ids: &[String], options: MutationOptions<()>) -> Result<(), ApiError> {
        let result = async {
            self.repository.delete_many(ids).await?;
            for id in ids {
                self.apply_change(&ResourceChange::Deleted(id.clone()));
            }
            info!(resource = %self.resource(), count = ids.len(), "bulk deleted");
            Ok::<_, ApiError>(())
        }
        .await;
        self.settle("bulk delete", result, &options)
    }
}
