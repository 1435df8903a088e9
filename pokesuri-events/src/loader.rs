use async_trait::async_trait;
use futures::future;
use log::{debug, error, info};
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::PageConfig,
    model::{EventSet, UnofficialLinks},
    normalize::normalize_records,
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("`{path}` was not found")]
    NotFound { path: String },

    #[error("`{path}` answered with status {status}")]
    Status { path: String, status: u16 },

    #[error("request for `{path}` failed: {message}")]
    Transport { path: String, message: String },

    #[error("failed to read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{path}` is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest `{path}` is not a list of file paths")]
    Manifest { path: String },
}

/// Where the static JSON files come from.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetches and parses the JSON document at `path`, relative to the site base.
    async fn fetch_json(&self, path: &str) -> Result<Value, LoadError>;
}

/// Loads every file listed in the manifest, all or nothing, and flattens
/// them into one record list in file order.
pub async fn try_load_records<S>(source: &S, manifest: &str) -> Result<Vec<Value>, LoadError>
where
    S: Source + ?Sized,
{
    let paths = match source.fetch_json(manifest).await? {
        Value::Array(paths) => paths
            .into_iter()
            .map(|path| match path {
                Value::String(path) => Ok(path),
                _ => Err(LoadError::Manifest {
                    path: manifest.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(LoadError::Manifest {
                path: manifest.to_string(),
            })
        }
    };

    debug!("Manifest `{manifest}` lists {} files", paths.len());

    let files =
        future::try_join_all(paths.iter().map(|path| source.fetch_json(path))).await?;

    Ok(files
        .into_iter()
        .flat_map(|file| match file {
            Value::Array(records) => records,
            record => vec![record],
        })
        .collect())
}

/// Like [`try_load_records`], but a failed load is logged and yields no records.
pub async fn load_records<S>(source: &S, manifest: &str) -> Vec<Value>
where
    S: Source + ?Sized,
{
    match try_load_records(source, manifest).await {
        Ok(records) => records,
        Err(err) => {
            error!("Failed to load event data: {err}");
            Vec::new()
        }
    }
}

/// Loads the optional link file. Absence is expected and yields an empty mapping.
pub async fn load_unofficial_links<S>(source: &S, path: &str) -> UnofficialLinks
where
    S: Source + ?Sized,
{
    let value = match source.fetch_json(path).await {
        Ok(value) => value,
        Err(err) => {
            debug!("No unofficial links loaded: {err}");
            return UnofficialLinks::new();
        }
    };

    serde_json::from_value(value).unwrap_or_else(|err| {
        debug!("Ignoring malformed unofficial links in `{path}`: {err}");
        UnofficialLinks::new()
    })
}

pub async fn load_event_set<S>(source: &S, config: &PageConfig) -> EventSet
where
    S: Source + ?Sized,
{
    let records = load_records(source, &config.manifest);

    let links = async {
        match &config.unofficial_links {
            Some(path) => load_unofficial_links(source, path).await,
            None => UnofficialLinks::new(),
        }
    };

    let (records, links) = future::join(records, links).await;
    let events = normalize_records(records, &links);
    let shown = events.display_len();
    info!(
        "Loaded {shown} events and {} passthrough records",
        events.len() - shown
    );

    events
}
