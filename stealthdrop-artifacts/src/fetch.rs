//! Network side of the artifact cache.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ArtifactError;

/// Downloads the raw body behind a URL.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ArtifactError>;
}

/// Plain HTTP GET fetcher.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ArtifactError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ArtifactError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // The whole body is buffered before anything is handed back, so a
        // connection dropped mid-transfer never reaches the store.
        let body = response.bytes().await.map_err(|e| ArtifactError::Fetch {
            url: url.to_string(),
            reason: format!("failed to read body: {}", e),
        })?;
        debug!(url, len = body.len(), "fetched artifact body");
        Ok(body.to_vec())
    }
}
