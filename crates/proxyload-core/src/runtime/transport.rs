//! Transports fetch artifact and release documents by URL.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Fetches the text of a URL.
///
/// Implementations must be Send + Sync; the lazy loader calls them from
/// spawned tasks.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// Reads URLs as filesystem paths, for hosts that serve a local dist
/// directory. A `file://` prefix is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTransport;

impl FsTransport {
    fn path(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

#[async_trait]
impl Transport for FsTransport {
    async fn get(&self, url: &str) -> Result<String> {
        tokio::fs::read_to_string(Self::path(url))
            .await
            .map_err(|e| Error::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// HTTP transport using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Client with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String> {
        let fetch_error = |e: reqwest::Error| Error::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };
        self.client
            .get(url)
            .send()
            .await
            .map_err(fetch_error)?
            .error_for_status()
            .map_err(fetch_error)?
            .text()
            .await
            .map_err(fetch_error)
    }
}
