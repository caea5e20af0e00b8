use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::contract::{Document, PageFetcher};
use crate::error::{FetchError, SetupError};

/// [`PageFetcher`] backed by a single reqwest client.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetcher whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SetupError::Client)?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, location: &Url) -> Result<Document, FetchError> {
        debug!(location = %location, "Fetching page");

        let response = self
            .client
            .get(location.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| FetchError::Request {
                location: location.to_string(),
                source,
            })?;

        let effective = response.url().clone();
        let body = response.text().await.map_err(|source| FetchError::Body {
            location: effective.to_string(),
            source,
        })?;

        debug!(
            location = %location,
            effective = %effective,
            bytes = body.len(),
            "Fetched page"
        );
        Ok(Document::new(effective, body))
    }
}
