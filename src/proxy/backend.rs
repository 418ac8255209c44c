//! HTTP client for the upstream Ollama server.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, Method};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::VaultError;

/// Hop-by-hop headers are never forwarded in either direction.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

pub struct Backend {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("failed to build backend HTTP client")?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and wait for the response head.
    ///
    /// The timeout covers connecting and waiting for headers; a body that is already
    /// streaming is relayed for as long as the backend keeps producing it.
    pub async fn send(
        &self,
        method: Method,
        path_and_query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response, VaultError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let mut forwarded = HeaderMap::new();
        for (name, value) in headers {
            if is_hop_by_hop(name) || name == header::HOST || name == header::CONTENT_LENGTH {
                continue;
            }
            forwarded.append(name.clone(), value.clone());
        }

        debug!(%method, %url, bytes = body.len(), "forwarding to backend");
        let request = self
            .client
            .request(method, &url)
            .headers(forwarded)
            .body(body)
            .send();

        match tokio::time::timeout(Duration::from_secs(self.timeout_secs), request).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_connect() => {
                Err(VaultError::BackendUnavailable(format!("{url}: {e}")))
            }
            Ok(Err(e)) if e.is_timeout() => Err(VaultError::BackendTimeout(self.timeout_secs)),
            Ok(Err(e)) => Err(VaultError::BackendUnavailable(format!("{url}: {e}"))),
            Err(_) => Err(VaultError::BackendTimeout(self.timeout_secs)),
        }
    }
}
