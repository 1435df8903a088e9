use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use quick_cache::sync::Cache;
use tokio::sync::RwLock;

/// A fully read response, as kept in the cache storage.
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl StoredResponse {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Answer for a page that is neither reachable nor cached.
    #[must_use]
    pub fn offline() -> Self {
        let mut response = Self::new(StatusCode::SERVICE_UNAVAILABLE, "Offline");
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    /// Answer for an asset that is neither reachable nor cached.
    #[must_use]
    pub fn gateway_timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT, Bytes::new())
    }
}

impl IntoResponse for StoredResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// One named cache, keyed by request URL.
pub type NamedCache = Cache<String, StoredResponse>;

/// Named caches shared by every worker generation, in creation order.
pub struct CacheStorage {
    capacity: usize,
    caches: RwLock<Vec<(String, Arc<NamedCache>)>>,
}

impl CacheStorage {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            caches: Default::default(),
        })
    }

    /// Returns the cache called `name`, creating it if needed.
    pub async fn open(&self, name: &str) -> Arc<NamedCache> {
        if let Some(cache) = self.get(name).await {
            return cache;
        }

        let mut caches = self.caches.write().await;
        if let Some((_, cache)) = caches.iter().find(|(key, _)| key == name) {
            return Arc::clone(cache);
        }

        let cache = Arc::new(Cache::new(self.capacity));
        caches.push((name.to_string(), Arc::clone(&cache)));
        cache
    }

    pub async fn get(&self, name: &str) -> Option<Arc<NamedCache>> {
        self.caches
            .read()
            .await
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, cache)| Arc::clone(cache))
    }

    pub async fn keys(&self) -> Vec<String> {
        self.caches
            .read()
            .await
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub async fn delete(&self, name: &str) -> bool {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|(key, _)| key != name);
        caches.len() != before
    }

    /// Looks `url` up in every cache, oldest first.
    pub async fn match_any(&self, url: &str) -> Option<StoredResponse> {
        self.caches
            .read()
            .await
            .iter()
            .find_map(|(_, cache)| cache.get(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_is_idempotent() {
        let storage = CacheStorage::new(8);
        let first = storage.open("static-v1").await;
        first.insert("/a".into(), StoredResponse::new(StatusCode::OK, "a"));

        let again = storage.open("static-v1").await;
        assert_eq!(again.get("/a").unwrap().body, "a");
        assert_eq!(storage.keys().await, ["static-v1"]);
    }

    #[tokio::test]
    async fn match_any_prefers_oldest_cache() {
        let storage = CacheStorage::new(8);
        storage
            .open("static-v1")
            .await
            .insert("/a".into(), StoredResponse::new(StatusCode::OK, "old"));
        storage
            .open("static-v2")
            .await
            .insert("/a".into(), StoredResponse::new(StatusCode::OK, "new"));

        assert_eq!(storage.match_any("/a").await.unwrap().body, "old");
        assert!(storage.delete("static-v1").await);
        assert!(!storage.delete("static-v1").await);
        assert_eq!(storage.match_any("/a").await.unwrap().body, "new");
        assert!(storage.match_any("/b").await.is_none());
    }
}
