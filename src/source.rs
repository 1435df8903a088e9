use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use pokesuri_events::{LoadError, Source};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

/// Reads the data files from the deployed site.
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    /// `base` is the URL of the site root the data paths are relative to.
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch_json(&self, path: &str) -> Result<Value, LoadError> {
        let transport = |message: String| LoadError::Transport {
            path: path.to_string(),
            message,
        };

        let url = self.base.join(path).map_err(|err| transport(err.to_string()))?;
        debug!("Fetching {url}");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| transport(err.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(LoadError::NotFound {
                    path: path.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(LoadError::Status {
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| transport(err.to_string()))?;

        serde_json::from_slice(&body).map_err(|source| LoadError::Json {
            path: path.to_string(),
            source,
        })
    }
}

/// Reads the data files from a local checkout of the site.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins `path` below the root, refusing anything that climbs out of it.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
            .then(|| self.root.join(relative))
    }
}

#[async_trait]
impl Source for DirSource {
    async fn fetch_json(&self, path: &str) -> Result<Value, LoadError> {
        let not_found = || LoadError::NotFound {
            path: path.to_string(),
        };

        let file = self.resolve(path).ok_or_else(not_found)?;
        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(source) => {
                return Err(LoadError::Io {
                    path: path.to_string(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| LoadError::Json {
            path: path.to_string(),
            source,
        })
    }
}
