//! HTTP client for the remote default dataset.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

/// Public sample dataset used when no upload or local file is available.
pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/zaedulislam/motorcycle-sales-dataset/main/motor_sales_sample.csv";

pub struct RemoteClient {
    client: Client,
    url: String,
}

impl RemoteClient {
    /// Build a client with a request timeout.
    ///
    /// Errors are returned as plain strings: the source chain only records why
    /// an attempt failed before moving on.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|e| format!("cannot build HTTP client: {e}"))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the dataset body.
    pub fn fetch(&self) -> Result<Vec<u8>, String> {
        debug!(url = %self.url, "fetching remote dataset");
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("request failed with status {}", resp.status()));
        }

        let body = resp.bytes().map_err(|e| format!("failed to read response body: {e}"))?;
        Ok(body.to_vec())
    }
}
