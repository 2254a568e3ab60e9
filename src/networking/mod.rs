use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;

use crate::error::SyncError;

const API_KEY_HEADER: &str = "X-API-Key";

/// Fetch boundary the sync engine talks to. Pure I/O, no decision logic;
/// implemented by [`ApiClient`] in production and by in-memory fakes in
/// engine tests.
pub trait RemoteFetcher {
    /// GET `url` and return the full response body.
    fn fetch_bytes(
        &self,
        url: &str,
        api_key: Option<&str>,
    ) -> impl Future<Output = Result<Vec<u8>, SyncError>> + Send;

    /// GET `url` and decode the body as UTF-8 text.
    fn fetch_text(
        &self,
        url: &str,
        api_key: Option<&str>,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|err| {
                warn!("api client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<Vec<u8>, SyncError> {
        debug!("api client: GET {url}");
        let mut request = self.client.get(url);
        if let Some(key) = api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("request to {url} failed: {e}")))?
            .error_for_status()
            .map_err(|e| SyncError::Network(format!("bad status from {url}: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| SyncError::Network(format!("body read from {url} failed: {e}")))?;
        Ok(body.to_vec())
    }
}

impl RemoteFetcher for ApiClient {
    async fn fetch_bytes(&self, url: &str, api_key: Option<&str>) -> Result<Vec<u8>, SyncError> {
        self.get(url, api_key).await
    }

    async fn fetch_text(&self, url: &str, api_key: Option<&str>) -> Result<String, SyncError> {
        let bytes = self.get(url, api_key).await?;
        Ok(String::from_utf8(bytes)?)
    }
}
