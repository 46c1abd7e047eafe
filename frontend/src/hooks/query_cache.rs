//! # Query Cache
//!
//! Keeps the last result of every query under an ordered key such as
//! `["bank", "paginated", "{...}"]`. Entries go stale after `stale_time` or
//! when a key prefix is invalidated; stale data stays readable until the
//! next fetch replaces it.
//!
//! Concurrent fetches of the same key are coalesced: the first caller
//! performs the request, later callers wait and reuse its result.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, trace};

use crate::services::error::ApiError;

/// Ordered tuple identifying one cached query result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn push(mut self, part: impl Into<String>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Append a serialised query object. Struct fields serialise in a fixed
    /// order, so equal queries give equal keys.
    pub fn push_json<Q: Serialize>(self, query: &Q) -> Self {
        let encoded = serde_json::to_string(query).unwrap_or_default();
        self.push(encoded)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_time
    }
}

struct CacheInner {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    stale_time: Duration,
}

/// Shared, cloneable handle to the client-side cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                stale_time,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Entry>> {
        self.inner.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Entry>> {
        self.inner.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>> {
        self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached value for `key`, fresh or stale
    pub fn get<V>(&self, key: &CacheKey) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.read()
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<V>().cloned())
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn is_fresh(&self, key: &CacheKey) -> bool {
        self.read()
            .get(key)
            .is_some_and(|entry| entry.is_fresh(self.inner.stale_time))
    }

    fn get_fresh<V>(&self, key: &CacheKey) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.read()
            .get(key)
            .filter(|entry| entry.is_fresh(self.inner.stale_time))
            .and_then(|entry| entry.value.downcast_ref::<V>().cloned())
    }

    /// Value written by a fetch that finished after `since`
    fn get_fetched_since<V>(&self, key: &CacheKey, since: Instant) -> Option<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.read()
            .get(key)
            .filter(|entry| !entry.invalidated && entry.fetched_at >= since)
            .and_then(|entry| entry.value.downcast_ref::<V>().cloned())
    }

    pub fn set<V>(&self, key: CacheKey, value: V)
    where
        V: Send + Sync + 'static,
    {
        trace!(%key, "cache set");
        self.write().insert(
            key,
            Entry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    pub fn invalidate(&self, prefix: &CacheKey) -> usize {
        let mut entries = self.write();
        let mut count = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        debug!(%prefix, count, "cache invalidated");
        count
    }

    /// Rewrite every entry of type `V` under `prefix`; returning `None`
    /// evicts the entry. Freshness is left as it was.
    pub fn update<V, F>(&self, prefix: &CacheKey, mut f: F) -> usize
    where
        V: Clone + Send + Sync + 'static,
        F: FnMut(V) -> Option<V>,
    {
        let mut entries = self.write();
        let keys: Vec<CacheKey> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();

        let mut touched = 0;
        for key in keys {
            let Some(entry) = entries.get_mut(&key) else {
                continue;
            };
            let Some(current) = entry.value.downcast_ref::<V>().cloned() else {
                continue;
            };
            touched += 1;
            match f(current) {
                Some(next) => entry.value = Arc::new(next),
                None => {
                    entries.remove(&key);
                }
            }
        }
        touched
    }

    /// Drop every entry under `prefix`
    pub fn remove(&self, prefix: &CacheKey) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Serve `key` from cache when fresh, otherwise run `fetcher` once and
    /// store its result. Callers racing on the same key share one fetch.
    pub async fn fetch<V, F, Fut>(&self, key: CacheKey, fetcher: F) -> Result<V, ApiError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        if let Some(value) = self.get_fresh::<V>(&key) {
            trace!(%key, "cache hit");
            return Ok(value);
        }

        let requested_at = Instant::now();
        let lock = self
            .in_flight()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            if let Some(value) = self.get_fetched_since::<V>(&key, requested_at) {
                debug!(%key, "joined in-flight fetch");
                Ok(value)
            } else {
                debug!(%key, "cache miss, fetching");
                match fetcher().await {
                    Ok(value) => {
                        self.set(key.clone(), value.clone());
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        };

        let mut in_flight = self.in_flight();
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &lock) && Arc::strong_count(&lock) == 2)
        {
            in_flight.remove(&key);
        }
        result
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}
