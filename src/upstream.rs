use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use log::debug;
use reqwest::Client;

use crate::{
    cache::StoredResponse,
    worker::{FetchError, FetchRequest, Network},
};

/// Request headers passed on to the origin; conditional and hop-by-hop
/// headers are left out so every response is complete.
const FORWARDED: [header::HeaderName; 3] =
    [header::ACCEPT, header::ACCEPT_LANGUAGE, header::USER_AGENT];

/// Response headers that describe the connection rather than the body.
const DROPPED: [header::HeaderName; 3] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
];

/// The real network, reached through reqwest.
#[derive(Clone)]
pub struct Upstream {
    client: Client,
}

impl Upstream {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for Upstream {
    async fn fetch(&self, request: &FetchRequest) -> Result<StoredResponse, FetchError> {
        let failed = |err: reqwest::Error| FetchError::Network {
            url: request.url.clone(),
            message: err.to_string(),
        };

        let mut headers = HeaderMap::new();
        for name in FORWARDED {
            if let Some(value) = request.headers.get(&name) {
                headers.insert(name, value.clone());
            }
        }

        debug!("Sending {} {}", request.method, request.url);
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(failed)?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in &DROPPED {
            headers.remove(name);
        }

        let body = response.bytes().await.map_err(failed)?;

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}
