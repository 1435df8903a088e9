//! Offline cache worker in front of the static site.
//!
//! Pages are served network first, falling back to the cache and then to the
//! cached `index.html`. Assets are served from the cache when possible and
//! refreshed in the background.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use axum::http::{header, HeaderMap, Method, StatusCode};
use futures::future;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use reqwest::Url;
use thiserror::Error;
use tokio::{sync::RwLock, task};

use crate::cache::{CacheStorage, StoredResponse};

pub const CACHE_PREFIX: &str = "static-";

static ASSET_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "css", "js", "mjs", "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "woff", "woff2",
        "ttf", "otf", "map",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: Url, message: String },
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("precaching {url} failed with status {status}")]
    Status { url: Url, status: StatusCode },

    #[error("`{0}` cannot be resolved against the origin")]
    Path(String),

    #[error("worker must be installed before it is activated")]
    NotInstalled,
}

/// Whether the request loads a page or something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Other,
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            mode: RequestMode::Other,
            headers: HeaderMap::new(),
        }
    }

    /// Navigation is told apart by `Sec-Fetch-Mode`, or by a GET whose
    /// `Accept` asks for HTML.
    #[must_use]
    pub fn mode_of(method: &Method, headers: &HeaderMap) -> RequestMode {
        let fetch_mode = headers
            .get("sec-fetch-mode")
            .and_then(|value| value.to_str().ok());

        if fetch_mode == Some("navigate") {
            return RequestMode::Navigate;
        }

        let accepts_html = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html"));

        if fetch_mode.is_none() && *method == Method::GET && accepts_html {
            RequestMode::Navigate
        } else {
            RequestMode::Other
        }
    }

    fn cache_key(&self) -> String {
        cache_key(&self.url)
    }
}

fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// Whatever actually performs requests for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Active,
    Redundant,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    /// Site base path, with leading and trailing slash.
    pub base: String,
    pub version: String,
    /// Paths precached in addition to the base page, `index.html` and `manifest.json`.
    pub extra_assets: Vec<String>,
}

pub struct CacheWorker {
    config: WorkerConfig,
    storage: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
}

impl CacheWorker {
    pub fn new(config: WorkerConfig, storage: Arc<CacheStorage>, network: Arc<dyn Network>) -> Self {
        Self {
            config,
            storage,
            network,
            state: RwLock::new(WorkerState::Installing),
        }
    }

    #[must_use]
    pub fn cache_name(&self) -> String {
        format!("{CACHE_PREFIX}{}", self.config.version)
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    fn resolve(&self, path: &str) -> Result<Url, WorkerError> {
        self.config
            .origin
            .join(path)
            .map_err(|_| WorkerError::Path(path.to_string()))
    }

    fn core_paths(&self) -> Vec<String> {
        let base = &self.config.base;
        let mut paths = vec![
            base.clone(),
            format!("{base}index.html"),
            format!("{base}manifest.json"),
        ];
        paths.extend(self.config.extra_assets.iter().cloned());
        paths
    }

    /// Precaches the core paths into the versioned cache. Nothing is stored
    /// unless every path loads.
    pub async fn install(&self) -> Result<(), WorkerError> {
        *self.state.write().await = WorkerState::Installing;

        match self.precache().await {
            Ok(count) => {
                info!("Installed {} with {count} core assets", self.cache_name());
                *self.state.write().await = WorkerState::Installed;
                Ok(())
            }
            Err(err) => {
                warn!("Installing {} failed: {err}", self.cache_name());
                *self.state.write().await = WorkerState::Redundant;
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, WorkerError> {
        let urls = self
            .core_paths()
            .iter()
            .map(|path| self.resolve(path))
            .collect::<Result<Vec<_>, _>>()?;

        let responses = future::try_join_all(urls.into_iter().map(|url| async move {
            let response = self.network.fetch(&FetchRequest::get(url.clone())).await?;
            if !response.status.is_success() {
                return Err(WorkerError::Status {
                    url,
                    status: response.status,
                });
            }
            Ok::<_, WorkerError>((cache_key(&url), response))
        }))
        .await?;

        let cache = self.storage.open(&self.cache_name()).await;
        let count = responses.len();
        for (key, response) in responses {
            cache.insert(key, response);
        }

        Ok(count)
    }

    /// Drops every older versioned cache and starts handling fetches.
    pub async fn activate(&self) -> Result<(), WorkerError> {
        if self.state().await != WorkerState::Installed {
            return Err(WorkerError::NotInstalled);
        }

        let current = self.cache_name();
        for key in self.storage.keys().await {
            if key.starts_with(CACHE_PREFIX) && key != current {
                self.storage.delete(&key).await;
                info!("Deleted outdated cache {key}");
            }
        }

        *self.state.write().await = WorkerState::Active;
        Ok(())
    }

    /// Answers a request, or `None` when the request is left to default handling.
    pub async fn fetch(&self, request: FetchRequest) -> Option<StoredResponse> {
        if self.state().await != WorkerState::Active || request.method != Method::GET {
            return None;
        }

        if request.url.origin() != self.config.origin.origin() {
            return None;
        }

        if request.mode == RequestMode::Navigate {
            return Some(self.network_first(request).await);
        }

        if is_asset(request.url.path()) {
            return Some(self.cache_first_with_revalidate(request).await);
        }

        None
    }

    async fn network_first(&self, request: FetchRequest) -> StoredResponse {
        let key = request.cache_key();

        match self.network.fetch(&request).await {
            Ok(fresh) => {
                self.storage
                    .open(&self.cache_name())
                    .await
                    .insert(key, fresh.clone());
                fresh
            }
            Err(err) => {
                debug!("Serving {key} offline: {err}");

                if let Some(cached) = self.storage.match_any(&key).await {
                    return cached;
                }

                let index = match self.resolve(&format!("{}index.html", self.config.base)) {
                    Ok(url) => self.storage.match_any(&cache_key(&url)).await,
                    Err(_) => None,
                };

                index.unwrap_or_else(StoredResponse::offline)
            }
        }
    }

    async fn cache_first_with_revalidate(&self, request: FetchRequest) -> StoredResponse {
        let key = request.cache_key();
        let cache = self.storage.open(&self.cache_name()).await;
        let cached = cache.get(&key);

        let network = Arc::clone(&self.network);
        let revalidate = task::spawn(async move {
            match network.fetch(&request).await {
                Ok(response) => {
                    if response.status == StatusCode::OK {
                        cache.insert(key, response.clone());
                    }
                    Some(response)
                }
                Err(err) => {
                    debug!("Revalidating {key} failed: {err}");
                    None
                }
            }
        });

        if let Some(cached) = cached {
            return cached;
        }

        revalidate
            .await
            .ok()
            .flatten()
            .unwrap_or_else(StoredResponse::gateway_timeout)
    }
}

/// Whether the path ends in one of the static asset extensions.
#[must_use]
pub fn is_asset(path: &str) -> bool {
    let file = path.rsplit('/').next().unwrap_or_default();

    file.rsplit_once('.')
        .is_some_and(|(_, extension)| ASSET_EXTENSIONS.contains(extension))
}
